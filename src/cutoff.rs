//! 外れ値比率による停止判定。
//!
//! 閾値は比率 p 以上となる最小の 2 の冪と最小の 3 の冪のうち小さい方。
//! 実行開始時に一度だけ計算し、現在の比率がそれに達したら拡張を止める。
//! 周期性の仮定が崩れた兆候を拾うヒューリスティックであり、正しさの保証ではない。

/// base^e ≥ p となる最小の base^e。
/// log の丸め誤差で冪ちょうどの値を取り違えないよう、指数を前後に補正する。
fn power_ceiling(base: f64, p: f64) -> f64 {
    let mut e = (p.ln() / base.ln()).ceil() as i32;
    while base.powi(e - 1) >= p {
        e -= 1;
    }
    while base.powi(e) < p {
        e += 1;
    }
    base.powi(e)
}

/// 外れ値比率 p に対する停止閾値 min(2^⌈log₂p⌉, 3^⌈log₃p⌉)。
/// p ≤ 0 のときは 0（最初の外れ値で停止）。
pub fn cutoff(outlier_proportion: f64) -> f64 {
    let p = outlier_proportion;
    if !(p > 0.0) || !p.is_finite() {
        return 0.0;
    }
    power_ceiling(2.0, p).min(power_ceiling(3.0, p))
}

/// 現在の比率が初期閾値に達したか
pub fn should_stop(current_proportion: f64, initial_cutoff: f64) -> bool {
    current_proportion > 0.0 && current_proportion >= initial_cutoff
}
