//! 性質ベーステスト

use proptest::prelude::*;
use ulam_binned::*;

fn modulus_strategy() -> impl Strategy<Value = RationalModulus> {
    (1i64..5000, 1i64..5000).prop_map(|(n, d)| RationalModulus::new(n, d).unwrap())
}

proptest! {
    #[test]
    fn test_bin_in_range(m in modulus_strategy(), t in any::<i64>()) {
        let b = m.bin(t);
        prop_assert!(b < m.bin_count());
    }

    #[test]
    fn test_bin_is_additive(m in modulus_strategy(), u in -1_000_000i64..1_000_000, v in -1_000_000i64..1_000_000) {
        let n = m.bin_count();
        prop_assert_eq!(m.bin(u + v), (m.bin(u) + m.bin(v)) % n);
    }

    #[test]
    fn test_arc_covers_pairs(n in 1usize..500, k_frac in 0.0f64..1.0, i_frac in 0.0f64..1.0) {
        let k = ((k_frac * n as f64) as usize).min(n - 1);
        let i = ((i_frac * n as f64) as usize).min(n - 1);
        let j = (k + n - i) % n;
        let arc = SearchArc::for_target(k, n);
        prop_assert!(arc.contains(i) || arc.contains(j));
    }

    #[test]
    fn test_cutoff_bounds(p in 1e-6f64..=1.0) {
        let c = cutoff(p);
        prop_assert!(c >= p);
        // 2 の冪の天井は p の 2 倍未満
        prop_assert!(c < 2.0 * p);
    }

    #[test]
    fn test_rationalize_tolerance(lambda in 1.5f64..20.0, exp in 2i32..7) {
        let eps = 10f64.powi(-exp);
        let cf = rationalize(lambda, eps, 1e-10).unwrap();
        let q = cf.numerator() as f64 / cf.denominator() as f64;
        if cf.within_tolerance {
            prop_assert!((q - lambda).abs() <= eps);
        } else {
            prop_assert!(cf.termination.is_early());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_binned_matches_naive_any_modulus(
        a in 1i64..6,
        gap in 1i64..6,
        n in 1i64..60,
        d in 1i64..60,
    ) {
        let b = a + gap;
        let seed = generate_seed(a, b, 12).unwrap();
        let reference = generate_seed(a, b, 70).unwrap();
        let mut ext = build_extender(n, d, seed.terms()).unwrap();
        while ext.term_count() < 70 {
            ext.test_next_term();
        }
        prop_assert_eq!(ext.terms(), reference.terms().to_vec());
    }
}
