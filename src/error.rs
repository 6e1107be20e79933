use thiserror::Error;

/// パイプライン各段の失敗。
///
/// 段ごとに失敗を明示的に返し、段をまたいだ回復はしない。
/// 呼び出し側（survey など）はペア単位でスキップする。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UlamError {
    /// 0 < a < b を満たさない開始値
    #[error("invalid Ulam pair: a={a}, b={b} (0 < a < b required)")]
    InvalidPair { a: i64, b: i64 },

    /// 項数 M < 2
    #[error("at least 2 terms required, got {requested}")]
    TooFewTerms { requested: usize },

    /// 一意表現集合が空（回復不能）
    #[error("no uniquely representable value left after {computed} terms")]
    NoRepresentative { computed: usize },

    /// 周期推定に項が1つも渡されなかった
    #[error("period estimation needs at least one term")]
    EmptySample,

    /// 角周波数の推定値が数値的にゼロ（λ が発散）
    #[error("angular estimate is numerically zero ({angle:e})")]
    ZeroAngle { angle: f64 },

    /// λ が有限な正の実数でない
    #[error("period must be finite and positive, got {lambda}")]
    InvalidPeriod { lambda: f64 },

    /// 連分数展開が許容誤差に届く前に破綻した
    #[error("no usable modulus: {reason}")]
    NoUsableModulus { reason: String },

    /// N > 0, D > 0 を満たさない有理法
    #[error("invalid modulus {numerator}/{denominator}")]
    InvalidModulus { numerator: i64, denominator: i64 },

    /// 初期項なしで拡張器を構築しようとした
    #[error("binned extender needs at least one seed term")]
    EmptySeed,

    /// 設定ファイルの読み込み・検証エラー
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, UlamError>;

impl UlamError {
    /// NoUsableModulus を生成
    pub fn no_usable_modulus(reason: impl Into<String>) -> Self {
        Self::NoUsableModulus { reason: reason.into() }
    }

    /// 推定段の失敗か（呼び出し側は naive のみの拡張にフォールバックできる）
    pub fn is_estimation_failure(&self) -> bool {
        matches!(
            self,
            Self::EmptySample
                | Self::ZeroAngle { .. }
                | Self::InvalidPeriod { .. }
                | Self::NoUsableModulus { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = UlamError::InvalidPair { a: 4, b: 3 };
        assert_eq!(e.to_string(), "invalid Ulam pair: a=4, b=3 (0 < a < b required)");

        let e = UlamError::no_usable_modulus("zero partial quotient");
        assert_eq!(e.to_string(), "no usable modulus: zero partial quotient");
    }

    #[test]
    fn test_estimation_failure_classification() {
        assert!(UlamError::ZeroAngle { angle: 0.0 }.is_estimation_failure());
        assert!(UlamError::no_usable_modulus("x").is_estimation_failure());
        assert!(!UlamError::NoRepresentative { computed: 3 }.is_estimation_failure());
        assert!(!UlamError::EmptySeed.is_estimation_failure());
    }
}
