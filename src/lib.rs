//! Ulam 数列 U(a,b) の効率的な逐次生成
//!
//! 各項は「直前の項より大きく、相異なる2項の和としてちょうど1通りに表せる最小の整数」。
//! 多くの (a,b) で項は実数 λ を法としてほぼ周期的に分布する（未証明）。
//!
//! 1. naive: O(n²) で初期項を作る
//! 2. signal: フーリエ和の最小点から λ を推定する
//! 3. rational: λ を連分数で有理近似し、法 (N, D) を得る
//! 4. binned: 剰余ビンと半周の弧で候補を判定し、数列を延長する
//! 5. cutoff: 外れ値比率が初期閾値に達したら拡張を止める

pub mod binned;
pub mod config;
pub mod cutoff;
pub mod error;
pub mod naive;
pub mod pair;
pub mod pipeline;
pub mod rational;
pub mod signal;
pub mod survey;

pub use binned::{build_extender, BinnedExtender, ExtenderState, RationalModulus, SearchArc};
pub use config::PipelineConfig;
pub use cutoff::{cutoff, should_stop};
pub use error::{Result, UlamError};
pub use naive::{count_representations, generate_seed, resume_generation, NaiveState};
pub use pair::UlamPair;
pub use pipeline::{extend_pair, initialize, ExtensionRun, IntermediateState, RunOutcome, RunReport};
pub use rational::{rationalize, refine_convergent, ContinuedFraction, Convergent, Termination};
pub use signal::{estimate_period, middle_third_proportion, PeriodEstimate};
pub use survey::{pairs_up_to, survey, PairReport, PairStatus};
