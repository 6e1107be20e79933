use std::f64::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UlamError};

/// パイプラインの定数群。
///
/// 複数の (a,b) を並列に処理しても互いに干渉しないよう、
/// グローバル定数ではなく各段に値として渡す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// naive 生成で作る初期項数
    pub seed_terms: usize,
    /// 粗い探索の分割数。(0, π] を π/num_segments 刻みで評価する
    pub num_segments: usize,
    /// 勾配降下の学習率係数。実際の学習率は factor / (最大項 · 項数)
    pub learning_rate_factor: f64,
    /// 勾配降下の反復回数
    pub refinement_iterations: usize,
    /// 連分数の剰余下限、角度ゼロ判定の閾値
    pub epsilon: f64,
    /// 連分数の許容誤差 ε。None なら λ の伝播誤差を使う
    pub tolerance: Option<f64>,
    /// 有理法の精度がこれ未満なら精緻化を試みる
    pub refine_below: f64,
    /// 精緻化で試す部分商の上限
    pub refine_breadth: i64,
    /// 1回の拡張で試す候補数の上限
    pub term_budget: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            seed_terms: 100,
            num_segments: 1000,
            learning_rate_factor: 0.01,
            refinement_iterations: 10,
            epsilon: 1e-10,
            tolerance: None,
            refine_below: 0.7,
            refine_breadth: 100,
            term_budget: 10_000,
        }
    }
}

impl PipelineConfig {
    /// 粗い探索の刻み幅 π / num_segments
    pub fn angular_resolution(&self) -> f64 {
        PI / self.num_segments as f64
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_seed_terms(mut self, seed_terms: usize) -> Self {
        self.seed_terms = seed_terms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.seed_terms < 2 {
            return Err(UlamError::Config(format!("seed_terms must be >= 2, got {}", self.seed_terms)));
        }
        if self.num_segments == 0 {
            return Err(UlamError::Config("num_segments must be > 0".into()));
        }
        if !(self.learning_rate_factor.is_finite() && self.learning_rate_factor >= 0.0) {
            return Err(UlamError::Config(format!(
                "learning_rate_factor must be finite and >= 0, got {}",
                self.learning_rate_factor
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(UlamError::Config(format!("epsilon must be > 0, got {}", self.epsilon)));
        }
        if let Some(tol) = self.tolerance {
            if !(tol.is_finite() && tol > 0.0) {
                return Err(UlamError::Config(format!("tolerance must be > 0, got {}", tol)));
            }
        }
        if self.refine_breadth < 0 {
            return Err(UlamError::Config("refine_breadth must be >= 0".into()));
        }
        Ok(())
    }

    /// JSON ファイルから読み込み、未指定のキーは既定値で埋める
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| UlamError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(text).map_err(|e| UlamError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
