//! フーリエ和による周期 λ の推定。
//!
//! S(x) = Σ cos(u·x) を (0, π] 上で粗く探索して最小点を取り、
//! S'(x) = −Σ u·sin(u·x) による固定ステップ勾配降下で精緻化する。
//! 項は λ を法として中央 1/3 に集中するため、u·(2π/λ) は π 付近に集まり S が最小になる。

use std::f64::consts::PI;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::{Result, UlamError};

/// 周期推定の結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodEstimate {
    /// 粗い探索で得た角周波数
    pub coarse_angle: f64,
    /// 勾配降下後の角周波数 x*
    pub angle: f64,
    /// λ = 2π / x*
    pub lambda: f64,
    /// 粗い探索の分解能から伝播した λ の誤差 (2π/x*²)·(π/num_segments)
    pub lambda_error: f64,
}

#[inline]
pub fn fourier_sum(terms: &[i64], x: f64) -> f64 {
    terms.iter().map(|&u| (u as f64 * x).cos()).sum()
}

#[inline]
pub fn fourier_derivative_sum(terms: &[i64], x: f64) -> f64 {
    terms
        .iter()
        .map(|&u| {
            let u = u as f64;
            -u * (u * x).sin()
        })
        .sum()
}

/// (0, π] を π/num_steps 刻みで評価し、S が最小となる x を返す。
/// x=0 から始めて厳密に小さい値のみ採用するため、改善がなければ 0 を返す。
pub fn coarse_search(terms: &[i64], num_steps: usize) -> f64 {
    let step = PI / num_steps as f64;
    let mut min_x = 0.0;
    let mut min_y = fourier_sum(terms, min_x);

    for i in 1..=num_steps {
        let x = step * i as f64;
        let y = fourier_sum(terms, x);
        if y < min_y {
            min_x = x;
            min_y = y;
        }
    }
    min_x
}

/// 固定学習率・固定回数の勾配降下
pub fn refine(start: f64, terms: &[i64], learning_rate: f64, iterations: usize) -> f64 {
    let mut x = start;
    for _ in 0..iterations {
        x -= learning_rate * fourier_derivative_sum(terms, x);
    }
    x
}

/// 学習率 = factor / (最大項 · 項数)。項の大きさに依らずステップを安定させる。
fn learning_rate(terms: &[i64], factor: f64) -> f64 {
    let max_term = terms.iter().map(|u| u.unsigned_abs()).max().unwrap_or(0) as f64;
    let scale = max_term * terms.len() as f64;
    if scale > 0.0 {
        factor / scale
    } else {
        0.0
    }
}

/// 項列から周期 λ を推定する。
/// 角周波数が数値的にゼロなら推定失敗（λ が発散する）。
pub fn estimate_period(terms: &[i64], config: &PipelineConfig) -> Result<PeriodEstimate> {
    if terms.is_empty() {
        return Err(UlamError::EmptySample);
    }

    let coarse_angle = coarse_search(terms, config.num_segments);
    if coarse_angle.abs() < config.epsilon {
        return Err(UlamError::ZeroAngle { angle: coarse_angle });
    }

    let lr = learning_rate(terms, config.learning_rate_factor);
    let angle = refine(coarse_angle, terms, lr, config.refinement_iterations);
    if !angle.is_finite() || angle.abs() < config.epsilon {
        return Err(UlamError::ZeroAngle { angle });
    }

    let lambda = 2.0 * PI / angle;
    if !(lambda.is_finite() && lambda > 0.0) {
        return Err(UlamError::InvalidPeriod { lambda });
    }
    let lambda_error = (2.0 * PI / (angle * angle)) * config.angular_resolution();

    debug!(coarse_angle, angle, lambda, lambda_error, samples = terms.len(), "period estimated");
    Ok(PeriodEstimate {
        coarse_angle,
        angle,
        lambda,
        lambda_error,
    })
}

/// u mod λ が開区間 (λ/3, 2λ/3) に入る項の割合
pub fn middle_third_proportion(terms: &[i64], lambda: f64) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let count = terms
        .iter()
        .filter(|&&u| {
            let r = (u as f64).rem_euclid(lambda);
            r > lambda / 3.0 && r < 2.0 * lambda / 3.0
        })
        .count();
    count as f64 / terms.len() as f64
}
