//! 連分数展開による λ の有理近似。
//!
//! 漸化式 a_n = q_n·a_{n-1} + a_{n-2}（b も同様）で収束分数を更新し、
//! |λ − a/b| ≤ ε となった時点で止める。

use std::fmt;

use num_traits::ToPrimitive;
use tracing::{debug, warn};

use crate::binned::RationalModulus;
use crate::error::{Result, UlamError};

/// 連分数展開の途中状態。現在の近似は a_current / b_current。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convergent {
    pub a_current: i64,
    pub a_previous: i64,
    pub b_current: i64,
    pub b_previous: i64,
}

impl Convergent {
    /// 最初の部分商 q0 から (q0, 1, 1, 0) で開始
    pub fn start(term: i64) -> Self {
        Convergent {
            a_current: term,
            a_previous: 1,
            b_current: 1,
            b_previous: 0,
        }
    }

    /// 次の部分商を追加した収束分数。桁あふれなら None。
    pub fn extended(&self, term: i64) -> Option<Self> {
        let a_next = term.checked_mul(self.a_current)?.checked_add(self.a_previous)?;
        let b_next = term.checked_mul(self.b_current)?.checked_add(self.b_previous)?;
        Some(Convergent {
            a_current: a_next,
            a_previous: self.a_current,
            b_current: b_next,
            b_previous: self.b_current,
        })
    }

    pub fn quotient(&self) -> f64 {
        self.a_current as f64 / self.b_current as f64
    }

    pub fn modulus(&self) -> Result<RationalModulus> {
        RationalModulus::new(self.a_current, self.b_current)
    }
}

/// 展開が止まった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// 許容誤差に到達
    WithinTolerance,
    /// 剰余が EPSILON 未満（有限連分数）
    Exact,
    /// 部分商 0 が現れた（剰余が縮まない）
    Degenerate,
    /// 部分商または収束分数が i64 に収まらない
    Overflow,
}

impl Termination {
    /// 許容誤差に届く前に打ち切られた可能性があるか
    pub fn is_early(&self) -> bool {
        !matches!(self, Termination::WithinTolerance)
    }
}

/// 連分数展開の結果
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuedFraction {
    /// 部分商 [q0, q1, ...]
    pub terms: Vec<i64>,
    /// 最後に有効だった収束分数
    pub convergent: Convergent,
    pub termination: Termination,
    /// |λ − N/D|
    pub error: f64,
    /// error ≤ ε か
    pub within_tolerance: bool,
}

impl ContinuedFraction {
    pub fn numerator(&self) -> i64 {
        self.convergent.a_current
    }

    pub fn denominator(&self) -> i64 {
        self.convergent.b_current
    }

    pub fn modulus(&self) -> Result<RationalModulus> {
        self.convergent.modulus()
    }
}

impl fmt::Display for ContinuedFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, q) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", q)?;
        }
        write!(f, "]")
    }
}

/// λ を誤差 ε 以内に近似する連分数を求める。
///
/// 剰余が epsilon 未満になれば有限連分数として、部分商 0 が出れば退化として止め、
/// いずれも直前の収束分数を返す（termination で区別する）。
pub fn rationalize(lambda: f64, tolerance: f64, epsilon: f64) -> Result<ContinuedFraction> {
    if !(lambda.is_finite() && lambda > 0.0) {
        return Err(UlamError::InvalidPeriod { lambda });
    }

    let first = lambda.floor();
    let Some(term) = first.to_i64() else {
        return Err(UlamError::no_usable_modulus(format!("integer part of {} overflows", lambda)));
    };

    let mut terms = vec![term];
    let mut conv = Convergent::start(term);
    let mut remainder = lambda;
    let mut q = first;
    let mut error = (lambda - conv.quotient()).abs();
    let mut termination = Termination::WithinTolerance;

    while error > tolerance {
        remainder -= q;
        if remainder < epsilon {
            termination = Termination::Exact;
            break;
        }
        remainder = 1.0 / remainder;
        q = remainder.floor();

        let next = q.to_i64().and_then(|t| if t == 0 { None } else { Some(t) });
        let Some(t) = next else {
            termination = if q == 0.0 { Termination::Degenerate } else { Termination::Overflow };
            break;
        };
        let Some(extended) = conv.extended(t) else {
            termination = Termination::Overflow;
            break;
        };

        terms.push(t);
        conv = extended;
        error = (lambda - conv.quotient()).abs();
    }

    let cf = ContinuedFraction {
        terms,
        convergent: conv,
        termination,
        error,
        within_tolerance: error <= tolerance,
    };
    if termination.is_early() && !cf.within_tolerance {
        warn!(lambda, tolerance, ?termination, error, "continued fraction stopped before tolerance");
    }
    debug!(lambda, %cf, numerator = cf.numerator(), denominator = cf.denominator(), "rationalized");
    Ok(cf)
}

/// 中央 1/3 精度が上がる部分商を 1..=breadth から探し、収束分数を延長する。
/// 改善するたびに採用し、そこから次の候補を作る。1度でも改善すれば true。
pub fn refine_convergent(conv: &mut Convergent, terms: &[i64], breadth: i64) -> bool {
    let mut refined = false;
    let mut best = accuracy_of(conv, terms);

    for q in 1..=breadth {
        let Some(candidate) = conv.extended(q) else {
            break;
        };
        let candidate_accuracy = accuracy_of(&candidate, terms);
        if candidate_accuracy > best {
            *conv = candidate;
            best = candidate_accuracy;
            refined = true;
        }
    }
    refined
}

fn accuracy_of(conv: &Convergent, terms: &[i64]) -> f64 {
    conv.modulus().map(|m| m.accuracy(terms)).unwrap_or(0.0)
}
