//! 剰余ビンによる逐次拡張。
//!
//! 有理法 (N, D) で各項を bin(t) = (t·D) mod N に振り分ける。
//! 候補 c = u + v の表現を数えるとき、bin(u) + bin(v) ≡ bin(c) (mod N) なので、
//! 各非順序対 {u, v} の少なくとも一方を含む半周分の弧だけを走査すればよい。
//!
//! 弧の取り方は対称性だけで決まり、どの (N, D) でも表現数は総当たりと一致する。
//! 周期性の仮定が効くのは走査コスト（弧上のビンの占有数）の側で、
//! 仮定が崩れるとビンが偏らなくなり高速化が失われる。それを検出するのが
//! 外れ値比率（cutoff モジュール）の役割。

use std::collections::HashSet;

use num_integer::Integer;
use tracing::trace;

use crate::error::{Result, UlamError};

/// 周期 λ の有理近似 N/D。N がビン数、D がビンへの写像の乗数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RationalModulus {
    numerator: i64,
    denominator: i64,
}

impl RationalModulus {
    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        if numerator <= 0 || denominator <= 0 {
            return Err(UlamError::InvalidModulus { numerator, denominator });
        }
        Ok(RationalModulus { numerator, denominator })
    }

    /// ビン数 N
    #[inline]
    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    #[inline]
    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    #[inline]
    pub fn bin_count(&self) -> usize {
        self.numerator as usize
    }

    /// 近似している実数 N/D
    pub fn value(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// bin(t) = (t·D) mod N ∈ [0, N)。負の t や i64 境界付近でも桁あふれしない。
    #[inline]
    pub fn bin(&self, t: i64) -> usize {
        let product = t as i128 * self.denominator as i128;
        product.mod_floor(&(self.numerator as i128)) as usize
    }

    /// ビンが中央 1/3 [N/3, 2N/3] の外にあるか
    #[inline]
    pub fn is_outlier_bin(&self, bin: usize) -> bool {
        let k = bin as i128 * 3;
        let n = self.numerator as i128;
        k < n || k > 2 * n
    }

    #[inline]
    pub fn is_outlier(&self, t: i64) -> bool {
        self.is_outlier_bin(self.bin(t))
    }

    /// 中央 1/3 に入る項の割合。法の選択用で、境界は整数除算の半開区間
    /// [N/3, 2N/3) を使う。
    pub fn accuracy(&self, terms: &[i64]) -> f64 {
        if terms.is_empty() {
            return 0.0;
        }
        let n = self.bin_count();
        let (low, high) = (n / 3, 2 * n / 3);
        let outliers = terms
            .iter()
            .filter(|&&t| {
                let r = self.bin(t);
                r < low || r >= high
            })
            .count();
        1.0 - outliers as f64 / terms.len() as f64
    }
}

/// 走査するビン番号の円弧。start から len 個、N を法として増加方向に並ぶ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchArc {
    start: usize,
    len: usize,
    n: usize,
}

impl SearchArc {
    /// 目標ビン k に対する弧。
    ///
    /// half = k/2, antihalf = (k+N)/2（k+N が奇数なら切り捨て）。
    /// 3k < 2N なら half → antihalf、それ以外は antihalf → half（N を跨いで一周側）。
    /// どちらの向きでも i + j ≡ k (mod N) を満たす (i, j) の一方が必ず弧に入る。
    pub fn for_target(k: usize, n: usize) -> Self {
        debug_assert!(k < n);
        let half = k / 2;
        let antihalf = ((k + n) / 2) % n;
        if 3 * k < 2 * n {
            Self::between(half, antihalf, n)
        } else {
            Self::between(antihalf, half, n)
        }
    }

    /// from から to まで（両端含む）増加方向の弧
    fn between(from: usize, to: usize, n: usize) -> Self {
        SearchArc {
            start: from,
            len: (to + n - from) % n + 1,
            n,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn contains(&self, bin: usize) -> bool {
        (bin + self.n - self.start) % self.n < self.len
    }

    pub fn bins(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).map(move |i| (self.start + i) % self.n)
    }
}

/// 拡張の進行状態。last_tested と total は単調増加。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtenderState {
    /// 最後に判定した候補値
    pub last_tested: i64,
    /// 中央 1/3 の外にある項の数
    pub outliers: u64,
    /// 既知の項の総数
    pub total: u64,
}

/// ビン分割による Ulam 数列の逐次拡張器
#[derive(Debug, Clone)]
pub struct BinnedExtender {
    modulus: RationalModulus,
    bins: Vec<HashSet<i64>>,
    state: ExtenderState,
}

impl BinnedExtender {
    /// 初期項をビンに振り分けて構築する
    pub fn new(modulus: RationalModulus, seed: &[i64]) -> Result<Self> {
        let last_tested = *seed.iter().max().ok_or(UlamError::EmptySeed)?;

        let n = modulus.bin_count();
        let mut occupancy = vec![0usize; n];
        for &t in seed {
            occupancy[modulus.bin(t)] += 1;
        }
        // 初期密度の2倍を確保し、拡張中の再ハッシュを抑える
        let mut bins: Vec<HashSet<i64>> = occupancy
            .iter()
            .map(|&c| HashSet::with_capacity(c * 2))
            .collect();

        let mut state = ExtenderState { last_tested, outliers: 0, total: 0 };
        for &t in seed {
            let b = modulus.bin(t);
            if bins[b].insert(t) {
                state.total += 1;
                if modulus.is_outlier_bin(b) {
                    state.outliers += 1;
                }
            }
        }

        Ok(BinnedExtender { modulus, bins, state })
    }

    pub fn modulus(&self) -> RationalModulus {
        self.modulus
    }

    pub fn state(&self) -> ExtenderState {
        self.state
    }

    pub fn last_tested(&self) -> i64 {
        self.state.last_tested
    }

    pub fn term_count(&self) -> u64 {
        self.state.total
    }

    pub fn outlier_count(&self) -> u64 {
        self.state.outliers
    }

    pub fn outlier_proportion(&self) -> f64 {
        if self.state.total == 0 {
            return 0.0;
        }
        self.state.outliers as f64 / self.state.total as f64
    }

    pub fn contains(&self, t: i64) -> bool {
        self.bins[self.modulus.bin(t)].contains(&t)
    }

    pub fn bin_occupancy(&self) -> Vec<usize> {
        self.bins.iter().map(|b| b.len()).collect()
    }

    /// 全項を昇順で返す
    pub fn terms(&self) -> Vec<i64> {
        let mut terms: Vec<i64> = self.bins.iter().flatten().copied().collect();
        terms.sort_unstable();
        terms
    }

    /// candidate の表現数を弧上のビンから数える。2 を超えた時点で打ち切る。
    fn count_representations(&self, candidate: i64, arc: &SearchArc) -> usize {
        let mut count = 0;
        for b in arc.bins() {
            for &u in &self.bins[b] {
                // i64 に収まらない相手は項になり得ない
                let Some(v) = candidate.checked_sub(u) else {
                    continue;
                };
                let vb = self.modulus.bin(v);
                if !self.bins[vb].contains(&v) {
                    continue;
                }
                // 相手も弧上にあれば (v, u) 側からも見えるので u < v の向きだけ数える
                if (vb == b || arc.contains(vb)) && u >= v {
                    continue;
                }
                count += 1;
                if count > 1 {
                    return count;
                }
            }
        }
        count
    }

    /// 次の候補 last_tested + 1 を判定する。
    /// 表現がちょうど1通りなら項として追加して true。
    /// last_tested が i64::MAX なら何もせず false。
    pub fn test_next_term(&mut self) -> bool {
        let Some(candidate) = self.state.last_tested.checked_add(1) else {
            return false;
        };
        let k = self.modulus.bin(candidate);
        let arc = SearchArc::for_target(k, self.modulus.bin_count());

        let accepted = self.count_representations(candidate, &arc) == 1;
        self.state.last_tested = candidate;

        if accepted {
            self.bins[k].insert(candidate);
            self.state.total += 1;
            let outlier = self.modulus.is_outlier_bin(k);
            if outlier {
                self.state.outliers += 1;
            }
            trace!(term = candidate, bin = k, outlier, "term accepted");
        }
        accepted
    }

    /// 最大 max_candidates 個の候補を試し、最初に採用された項を返す
    pub fn next_term(&mut self, max_candidates: u64) -> Option<i64> {
        for _ in 0..max_candidates {
            if self.test_next_term() {
                return Some(self.state.last_tested);
            }
        }
        None
    }
}

/// (N, D) と初期項から拡張器を作る
pub fn build_extender(numerator: i64, denominator: i64, seed: &[i64]) -> Result<BinnedExtender> {
    BinnedExtender::new(RationalModulus::new(numerator, denominator)?, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naive::{count_representations, generate_seed};

    #[test]
    fn test_modulus_validation() {
        assert!(RationalModulus::new(22, 9).is_ok());
        assert!(RationalModulus::new(0, 1).is_err());
        assert!(RationalModulus::new(5, 0).is_err());
        assert!(RationalModulus::new(-3, 2).is_err());
    }

    #[test]
    fn test_bin_negative_and_extreme() {
        let m = RationalModulus::new(22, 9).unwrap();
        assert_eq!(m.bin(0), 0);
        assert_eq!(m.bin(1), 9);
        assert_eq!(m.bin(-1), 13);
        assert!(m.bin(i64::MIN) < 22);
        assert!(m.bin(i64::MAX) < 22);
    }

    #[test]
    fn test_outlier_bins() {
        let m = RationalModulus::new(9, 1).unwrap();
        let outliers: Vec<usize> = (0..9).filter(|&b| m.is_outlier_bin(b)).collect();
        // 中央 [3, 6] 以外
        assert_eq!(outliers, vec![0, 1, 2, 7, 8]);
    }

    #[test]
    fn test_accuracy_half_open_middle() {
        let m = RationalModulus::new(9, 1).unwrap();
        let terms: Vec<i64> = (0..9).collect();
        // 中央は [3, 6)
        assert!((m.accuracy(&terms) - 3.0 / 9.0).abs() < 1e-12);
        assert_eq!(m.accuracy(&[]), 0.0);
    }

    #[test]
    fn test_extreme_seed_terms() {
        let mut ext = build_extender(1, 1, &[i64::MIN + 1, 0, 5]).unwrap();
        // 6 = 5 + 1 は 1 が項でないので表現なし、i64::MIN + 1 との差はあふれる
        assert!(!ext.test_next_term());
        assert_eq!(ext.last_tested(), 6);
        assert_eq!(ext.term_count(), 3);

        let mut top = build_extender(1, 1, &[0, i64::MAX]).unwrap();
        assert!(!top.test_next_term());
        assert_eq!(top.last_tested(), i64::MAX);
        assert_eq!(top.next_term(10), None);
    }

    #[test]
    fn test_arc_covers_every_residue_pair() {
        for n in 1..40 {
            for k in 0..n {
                let arc = SearchArc::for_target(k, n);
                assert!(arc.len() >= 1 && arc.len() <= n);
                for i in 0..n {
                    let j = (k + n - i) % n;
                    assert!(arc.contains(i) || arc.contains(j), "n={} k={} i={} j={}", n, k, i, j);
                }
            }
        }
    }

    #[test]
    fn test_arc_direction() {
        // 3k < 2N: half から antihalf へ
        let arc = SearchArc::for_target(4, 10);
        assert_eq!(arc.bins().collect::<Vec<_>>(), vec![2, 3, 4, 5, 6, 7]);
        // それ以外: antihalf から N を跨いで half へ
        let arc = SearchArc::for_target(8, 10);
        assert_eq!(arc.bins().collect::<Vec<_>>(), vec![9, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_seed() {
        let m = RationalModulus::new(22, 9).unwrap();
        assert_eq!(BinnedExtender::new(m, &[]).unwrap_err(), UlamError::EmptySeed);
    }

    #[test]
    fn test_construction_counts() {
        let m = RationalModulus::new(9, 1).unwrap();
        let ext = BinnedExtender::new(m, &[1, 4, 5, 8]).unwrap();
        assert_eq!(ext.term_count(), 4);
        // bin = t mod 9: 1, 4, 5, 8 → 外れ値は 1 と 8
        assert_eq!(ext.outlier_count(), 2);
        assert_eq!(ext.last_tested(), 8);
        assert!((ext.outlier_proportion() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_matches_naive_u12() {
        let seed = generate_seed(1, 2, 40).unwrap();
        let reference = generate_seed(1, 2, 140).unwrap();
        let m = RationalModulus::new(22, 9).unwrap();
        let mut ext = BinnedExtender::new(m, seed.terms()).unwrap();
        while ext.term_count() < 140 {
            assert!(ext.next_term(10_000).is_some());
        }
        assert_eq!(ext.terms(), reference.terms());
    }

    #[test]
    fn test_accepted_terms_have_one_representation() {
        let seed = generate_seed(1, 2, 30).unwrap();
        let m = RationalModulus::new(22, 9).unwrap();
        let mut ext = BinnedExtender::new(m, seed.terms()).unwrap();
        for _ in 0..40 {
            let before = ext.terms();
            let t = ext.next_term(10_000).unwrap();
            assert_eq!(count_representations(&before, t), 1, "term {}", t);
        }
    }

    #[test]
    fn test_wrong_modulus_still_exact() {
        // 周期と無関係な法でも表現数は変わらない（速度だけが落ちる）
        let seed = generate_seed(2, 3, 20).unwrap();
        let reference = generate_seed(2, 3, 80).unwrap();
        let m = RationalModulus::new(7, 3).unwrap();
        let mut ext = BinnedExtender::new(m, seed.terms()).unwrap();
        while ext.term_count() < 80 {
            ext.test_next_term();
        }
        assert_eq!(ext.terms(), reference.terms());
    }

    #[test]
    fn test_state_monotonic() {
        let seed = generate_seed(1, 2, 20).unwrap();
        let m = RationalModulus::new(22, 9).unwrap();
        let mut ext = BinnedExtender::new(m, seed.terms()).unwrap();
        let mut prev = ext.state();
        for _ in 0..200 {
            ext.test_next_term();
            let s = ext.state();
            assert_eq!(s.last_tested, prev.last_tested + 1);
            assert!(s.total >= prev.total);
            assert!(s.outliers >= prev.outliers);
            prev = s;
        }
    }
}
