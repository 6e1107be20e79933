//! 1組の (a,b) に対するパイプライン。
//!
//! naive 生成 → 周期推定 → 連分数 → ビン拡張器、の順に各段の出力全体を次段に渡す。

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::binned::{BinnedExtender, RationalModulus};
use crate::config::PipelineConfig;
use crate::cutoff::{cutoff, should_stop};
use crate::error::{Result, UlamError};
use crate::naive::{generate_seed, NaiveState};
use crate::pair::UlamPair;
use crate::rational::{rationalize, refine_convergent, ContinuedFraction, Termination};
use crate::signal::{estimate_period, middle_third_proportion, PeriodEstimate};

/// 効率的な拡張を始めるのに必要な初期データ
#[derive(Debug, Clone)]
pub struct IntermediateState {
    pub pair: UlamPair,
    pub seed: NaiveState,
    pub estimate: PeriodEstimate,
    /// 連分数展開に使った許容誤差 ε
    pub tolerance: f64,
    pub fraction: ContinuedFraction,
    /// 拡張器に渡す法（精緻化後）
    pub modulus: RationalModulus,
    /// 精緻化で法を延長したか
    pub refined: bool,
    /// 初期項のうち実数 λ の中央 1/3 に入る割合
    pub middle_third: f64,
    /// 初期項のうち法 (N, D) で外れ値でない割合
    pub accuracy: f64,
}

impl IntermediateState {
    pub fn seed_terms(&self) -> &[i64] {
        self.seed.terms()
    }
}

/// seed → λ → (N, D) を計算する
pub fn initialize(pair: UlamPair, config: &PipelineConfig) -> Result<IntermediateState> {
    config.validate()?;

    let seed = generate_seed(pair.a, pair.b, config.seed_terms)?;
    let estimate = estimate_period(seed.terms(), config)?;

    let middle_third = middle_third_proportion(seed.terms(), estimate.lambda);
    if 2.0 * middle_third <= 0.5 {
        warn!(%pair, lambda = estimate.lambda, middle_third, "weak middle-third signal");
    }

    let tolerance = config.tolerance.unwrap_or(estimate.lambda_error);
    let fraction = rationalize(estimate.lambda, tolerance, config.epsilon)?;
    match fraction.termination {
        Termination::Degenerate | Termination::Overflow if !fraction.within_tolerance => {
            return Err(UlamError::no_usable_modulus(format!(
                "{:?} expansion of {} at {}",
                fraction.termination, estimate.lambda, fraction
            )));
        }
        _ => {}
    }

    let mut convergent = fraction.convergent;
    let mut accuracy = convergent.modulus()?.accuracy(seed.terms());
    let mut refined = false;
    if accuracy < config.refine_below && config.refine_breadth > 0 {
        refined = refine_convergent(&mut convergent, seed.terms(), config.refine_breadth);
        if refined {
            let before = accuracy;
            accuracy = convergent.modulus()?.accuracy(seed.terms());
            debug!(%pair, before, after = accuracy, "modulus refined");
        }
    }
    let modulus = convergent.modulus()?;

    info!(
        %pair,
        lambda = estimate.lambda,
        numerator = modulus.numerator(),
        denominator = modulus.denominator(),
        accuracy,
        "initial state ready"
    );

    Ok(IntermediateState {
        pair,
        seed,
        estimate,
        tolerance,
        fraction,
        modulus,
        refined,
        middle_third,
        accuracy,
    })
}

/// 拡張を止めた理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// 候補数の上限に達した
    BudgetExhausted,
    /// 目標項数に達した
    TargetReached,
    /// 外れ値比率が初期閾値に達した
    CutoffReached,
}

/// 拡張1回分の集計
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub candidates_tested: u64,
    pub terms_added: u64,
    pub term_count: u64,
    pub last_tested: i64,
    pub outlier_proportion: f64,
    pub cutoff: f64,
}

/// 1組分の拡張器と、開始時に一度だけ計算した停止閾値
#[derive(Debug, Clone)]
pub struct ExtensionRun {
    extender: BinnedExtender,
    initial_cutoff: f64,
}

impl ExtensionRun {
    pub fn new(modulus: RationalModulus, seed: &[i64]) -> Result<Self> {
        let extender = BinnedExtender::new(modulus, seed)?;
        let initial_cutoff = cutoff(extender.outlier_proportion());
        debug!(
            seed = extender.term_count(),
            proportion = extender.outlier_proportion(),
            initial_cutoff,
            "extension run created"
        );
        Ok(ExtensionRun { extender, initial_cutoff })
    }

    pub fn from_state(state: &IntermediateState) -> Result<Self> {
        Self::new(state.modulus, state.seed_terms())
    }

    pub fn extender(&self) -> &BinnedExtender {
        &self.extender
    }

    pub fn into_extender(self) -> BinnedExtender {
        self.extender
    }

    pub fn initial_cutoff(&self) -> f64 {
        self.initial_cutoff
    }

    /// 最大 budget 個の候補を試す。項が採用されるたびに停止判定し、
    /// target_terms が与えられればその項数で止める。
    pub fn run(&mut self, budget: u64, target_terms: Option<u64>) -> RunReport {
        let start_count = self.extender.term_count();
        let mut tested = 0u64;
        let mut outcome = RunOutcome::BudgetExhausted;

        while tested < budget {
            if target_terms.is_some_and(|t| self.extender.term_count() >= t) {
                outcome = RunOutcome::TargetReached;
                break;
            }
            tested += 1;
            if self.extender.test_next_term()
                && should_stop(self.extender.outlier_proportion(), self.initial_cutoff)
            {
                outcome = RunOutcome::CutoffReached;
                break;
            }
        }
        if outcome == RunOutcome::BudgetExhausted
            && target_terms.is_some_and(|t| self.extender.term_count() >= t)
        {
            outcome = RunOutcome::TargetReached;
        }

        RunReport {
            outcome,
            candidates_tested: tested,
            terms_added: self.extender.term_count() - start_count,
            term_count: self.extender.term_count(),
            last_tested: self.extender.last_tested(),
            outlier_proportion: self.extender.outlier_proportion(),
            cutoff: self.initial_cutoff,
        }
    }
}

/// 初期化から拡張までを通しで実行する
pub fn extend_pair(
    pair: UlamPair,
    config: &PipelineConfig,
    target_terms: Option<u64>,
) -> Result<(IntermediateState, ExtensionRun, RunReport)> {
    let state = initialize(pair, config)?;
    let mut run = ExtensionRun::from_state(&state)?;
    let report = run.run(config.term_budget, target_terms);
    info!(
        %pair,
        outcome = ?report.outcome,
        terms = report.term_count,
        tested = report.candidates_tested,
        "extension finished"
    );
    Ok((state, run, report))
}
