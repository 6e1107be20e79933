//! O(n²) の基本生成アルゴリズム。
//!
//! 各ステップで最新項と既存の全項との和を表現集合に畳み込み、
//! 一意表現集合の最小値を次の項とする。周期推定用の初期項を作るためだけに使う。

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::error::{Result, UlamError};
use crate::pair::UlamPair;

/// naive 生成の状態。再開（resume）可能。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaiveState {
    /// 計算済みの項（狭義単調増加）
    terms: Vec<i64>,
    /// ちょうど1通りの表現を持つ未採用の値
    unique: BTreeSet<i64>,
    /// 2通り以上の表現を持つ値。一度入ったら unique には戻らない
    multiple: HashSet<i64>,
}

impl NaiveState {
    /// 2項 (a, b) だけを持つ初期状態
    pub fn start(pair: UlamPair) -> Self {
        NaiveState {
            terms: vec![pair.a, pair.b],
            unique: BTreeSet::new(),
            multiple: HashSet::new(),
        }
    }

    pub fn terms(&self) -> &[i64] {
        &self.terms
    }

    pub fn into_terms(self) -> Vec<i64> {
        self.terms
    }

    pub fn computed_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn unique_set(&self) -> &BTreeSet<i64> {
        &self.unique
    }

    pub fn multiple_set(&self) -> &HashSet<i64> {
        &self.multiple
    }

    /// 最新項と既存項との和を畳み込む。
    /// 未出現 → unique、unique → multiple、multiple → 変化なし。
    fn fold_latest_sums(&mut self) {
        let Some((&latest, earlier)) = self.terms.split_last() else {
            return;
        };
        for &t in earlier {
            let v = latest + t;
            if self.multiple.contains(&v) {
                continue;
            }
            if !self.unique.remove(&v) {
                self.unique.insert(v);
            } else {
                self.multiple.insert(v);
            }
        }
    }

    /// 1項追加する
    fn push_next(&mut self) -> Result<i64> {
        self.fold_latest_sums();
        let next = self.unique.pop_first().ok_or(UlamError::NoRepresentative {
            computed: self.terms.len(),
        })?;
        self.terms.push(next);
        Ok(next)
    }

    /// num_terms 項になるまでその場で拡張する。既に足りていれば何もしない。
    pub fn extend_to(&mut self, num_terms: usize) -> Result<()> {
        if self.terms.len() >= num_terms {
            return Ok(());
        }
        self.terms.reserve(num_terms - self.terms.len());
        while self.terms.len() < num_terms {
            self.push_next()?;
        }
        Ok(())
    }
}

/// U(a,b) の最初の num_terms 項を生成する
pub fn generate_seed(a: i64, b: i64, num_terms: usize) -> Result<NaiveState> {
    let pair = UlamPair::new(a, b)?;
    if num_terms < 2 {
        return Err(UlamError::TooFewTerms { requested: num_terms });
    }
    let mut state = NaiveState::start(pair);
    state.extend_to(num_terms)?;
    debug!(%pair, num_terms, last = ?state.terms.last(), "naive seed generated");
    Ok(state)
}

/// 既存の状態から num_terms 項まで再開する。
/// prior が既に num_terms 項以上持っていればそのまま返す（冪等）。
pub fn resume_generation(prior: &NaiveState, num_terms: usize) -> Result<NaiveState> {
    let mut state = prior.clone();
    state.extend_to(num_terms)?;
    Ok(state)
}

/// value を相異なる2項の和で表す方法の数を総当たりで数える。
/// terms は昇順であること。
pub fn count_representations(terms: &[i64], value: i64) -> usize {
    if terms.len() < 2 {
        return 0;
    }
    let mut count = 0;
    let (mut lo, mut hi) = (0usize, terms.len() - 1);
    while lo < hi {
        let sum = terms[lo] + terms[hi];
        if sum == value {
            count += 1;
            lo += 1;
            hi -= 1;
        } else if sum < value {
            lo += 1;
        } else {
            hi -= 1;
        }
    }
    count
}
