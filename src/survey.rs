use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::pair::UlamPair;
use crate::pipeline::{extend_pair, RunReport};

/// 1組分の結果
#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    pub pair: UlamPair,
    pub lambda: Option<f64>,
    pub numerator: Option<i64>,
    pub denominator: Option<i64>,
    pub status: PairStatus,
}

#[derive(Debug, Clone, Serialize)]
pub enum PairStatus {
    Completed(RunReport),
    /// パイプラインのどこかで失敗。バッチ全体は止めない
    Skipped { reason: String },
}

impl PairReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, PairStatus::Skipped { .. })
    }
}

fn survey_one(pair: UlamPair, config: &PipelineConfig, target_terms: Option<u64>) -> PairReport {
    match extend_pair(pair, config, target_terms) {
        Ok((state, _run, report)) => PairReport {
            pair,
            lambda: Some(state.estimate.lambda),
            numerator: Some(state.modulus.numerator()),
            denominator: Some(state.modulus.denominator()),
            status: PairStatus::Completed(report),
        },
        Err(e) => {
            warn!(%pair, error = %e, "pair skipped");
            PairReport {
                pair,
                lambda: None,
                numerator: None,
                denominator: None,
                status: PairStatus::Skipped { reason: e.to_string() },
            }
        }
    }
}

/// 複数の (a,b) を Rayon で並列に処理する。
/// 各組は状態を共有しないので、組ごとに独立したタスクになる。
/// progress_callback: (完了数, 総数) を組が終わるたびに呼ぶ（スレッドセーフ）。
/// 結果は入力と同じ順に並ぶ。
pub fn survey(
    pairs: &[UlamPair],
    config: &PipelineConfig,
    target_terms: Option<u64>,
    progress_callback: impl Fn(u64, u64) + Sync,
) -> Vec<PairReport> {
    let total = pairs.len() as u64;
    let done = AtomicU64::new(0);

    pairs
        .par_iter()
        .map(|&pair| {
            let report = survey_one(pair, config, target_terms);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            progress_callback(finished, total);
            report
        })
        .collect()
}

/// 1 ≤ a < b ≤ max_b, a ≤ max_a の全組
pub fn pairs_up_to(max_a: i64, max_b: i64) -> Vec<UlamPair> {
    (1..=max_a)
        .flat_map(|a| ((a + 1)..=max_b).map(move |b| UlamPair { a, b }))
        .collect()
}
