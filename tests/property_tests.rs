//! Property-based tests for the statistical building blocks
//!
//! Properties covered:
//! 1. Benjamini-Hochberg bounds, monotonicity and adjusted >= raw
//! 2. Significance stars follow the p-value thresholds
//! 3. Table merge keeps every predictor and fills the missing marker
//! 4. Rank-sum test symmetry under swapping the samples
//! 5. Kruskal-Wallis p-values stay in [0, 1]

use bdg_replication::hypothesis::{benjamini_hochberg, kruskal_wallis, rank_sum_test};
use bdg_replication::table::{merge_tables, stars, CoefficientTable, MISSING};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_bh_bounded_and_not_below_raw(pvalues in prop::collection::vec(0.0f64..=1.0, 1..30)) {
        let adjusted = benjamini_hochberg(&pvalues);
        prop_assert_eq!(adjusted.len(), pvalues.len());
        for (p, q) in pvalues.iter().zip(&adjusted) {
            prop_assert!((0.0..=1.0).contains(q));
            prop_assert!(*q >= *p - 1e-15);
        }
    }

    #[test]
    fn prop_bh_monotone_in_rank_order(pvalues in prop::collection::vec(0.0f64..=1.0, 1..30)) {
        let adjusted = benjamini_hochberg(&pvalues);
        let mut order: Vec<usize> = (0..pvalues.len()).collect();
        order.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));
        for pair in order.windows(2) {
            prop_assert!(adjusted[pair[0]] <= adjusted[pair[1]] + 1e-15);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_stars_follow_thresholds(p in 0.0f64..=1.0) {
        let expected = if p < 0.01 {
            "***"
        } else if p < 0.05 {
            "**"
        } else if p < 0.1 {
            "*"
        } else {
            ""
        };
        prop_assert_eq!(stars(p), expected);
    }

    #[test]
    fn prop_merge_keeps_every_predictor(
        left in prop::collection::btree_set("[a-e]", 0..5),
        right in prop::collection::btree_set("[c-h]", 0..5),
    ) {
        let mut a = CoefficientTable::new("(1)");
        for name in &left {
            a.push(name.as_str(), "1");
        }
        let mut b = CoefficientTable::new("(2)");
        for name in &right {
            b.push(name.as_str(), "2");
        }

        let merged = merge_tables(&[a, b]);
        let union: std::collections::BTreeSet<&String> = left.iter().chain(&right).collect();
        prop_assert_eq!(merged.rows.len(), union.len());
        for (name, cells) in &merged.rows {
            prop_assert_eq!(cells.len(), 2);
            prop_assert_eq!(cells[0] == MISSING, !left.contains(name));
            prop_assert_eq!(cells[1] == MISSING, !right.contains(name));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_rank_sum_symmetric_under_swap(
        a in prop::collection::vec(0u8..=60, 1..40),
        b in prop::collection::vec(0u8..=60, 1..40),
    ) {
        let a: Vec<f64> = a.into_iter().map(f64::from).collect();
        let b: Vec<f64> = b.into_iter().map(f64::from).collect();

        let ab = rank_sum_test(&a, &b, 50).unwrap();
        let ba = rank_sum_test(&b, &a, 50).unwrap();
        prop_assert!((ab.p_value - ba.p_value).abs() < 1e-9);
        prop_assert!((ab.z + ba.z).abs() < 1e-9);
        prop_assert!((0.0..=1.0).contains(&ab.p_value));
        // W counts pairs, so the two orientations sum to n_a * n_b
        let pairs = (a.len() * b.len()) as f64;
        prop_assert!((ab.statistic + ba.statistic - pairs).abs() < 1e-9);
    }

    #[test]
    fn prop_kruskal_p_value_in_unit_interval(
        groups in prop::collection::vec(prop::collection::vec(0u8..=60, 1..20), 2..5),
    ) {
        let groups: Vec<Vec<f64>> = groups
            .into_iter()
            .map(|g| g.into_iter().map(f64::from).collect())
            .collect();
        let test = kruskal_wallis(&groups).unwrap();
        prop_assert!(test.statistic >= 0.0);
        prop_assert!((0.0..=1.0).contains(&test.p_value));
        prop_assert_eq!(test.df, groups.len() - 1);
    }
}
