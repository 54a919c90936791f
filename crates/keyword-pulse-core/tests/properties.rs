//! Property tests for the comparison engine, aggregation, and classifier.

use std::collections::BTreeSet;

use keyword_pulse_core::compare::{biggest_movers, compare};
use keyword_pulse_core::models::{keyword_key, Classification, KeywordRow, Period};
use keyword_pulse_core::opportunity::{classify, Thresholds};
use keyword_pulse_core::snapshot::Snapshot;
use proptest::prelude::*;

fn row_strategy() -> impl Strategy<Value = KeywordRow> {
    (
        prop::sample::select(vec![
            "seo", "SEO", "backup", "cloud storage", "Cloud  Storage", "rust", "vpn", "crm",
        ]),
        (0u32..400).prop_map(|p| p as f64 / 4.0),
        0u64..10_000,
        0u64..2_000,
    )
        .prop_map(|(k, pos, impr, clicks)| KeywordRow::new(k, pos, impr, clicks))
}

fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    prop::collection::vec(row_strategy(), 0..12)
        .prop_map(|rows| Snapshot::from_rows("prop", Period::Unknown, rows))
}

fn keys(s: &Snapshot) -> BTreeSet<String> {
    s.keys().map(str::to_string).collect()
}

fn keys_with(rows: &[keyword_pulse_core::models::ComparisonRow], class: Classification) -> BTreeSet<String> {
    rows.iter()
        .filter(|r| r.classification == class)
        .map(|r| keyword_key(&r.keyword))
        .collect()
}

proptest! {
    #[test]
    fn prop_aggregation_idempotent(s in snapshot_strategy()) {
        prop_assert_eq!(s.aggregate(), s.clone());
    }

    #[test]
    fn prop_one_row_per_union_key(a in snapshot_strategy(), b in snapshot_strategy()) {
        let rows = compare(&a, &b);
        let union: BTreeSet<String> = keys(&a).union(&keys(&b)).cloned().collect();
        prop_assert_eq!(rows.len(), union.len());

        let seen: Vec<String> = rows.iter().map(|r| keyword_key(&r.keyword)).collect();
        let distinct: BTreeSet<String> = seen.iter().cloned().collect();
        prop_assert_eq!(distinct.len(), seen.len());
        prop_assert_eq!(distinct, union);
    }

    #[test]
    fn prop_self_comparison_unchanged(a in snapshot_strategy()) {
        for row in compare(&a, &a) {
            prop_assert_eq!(row.classification, Classification::Unchanged);
            prop_assert_eq!(row.delta, Some(0.0));
        }
    }

    #[test]
    fn prop_new_and_dropped_are_set_differences(a in snapshot_strategy(), b in snapshot_strategy()) {
        let rows = compare(&a, &b);
        let dropped: BTreeSet<String> = keys(&a).difference(&keys(&b)).cloned().collect();
        let new: BTreeSet<String> = keys(&b).difference(&keys(&a)).cloned().collect();
        prop_assert_eq!(keys_with(&rows, Classification::Dropped), dropped);
        prop_assert_eq!(keys_with(&rows, Classification::New), new);
    }

    #[test]
    fn prop_delta_sign_matches_classification(a in snapshot_strategy(), b in snapshot_strategy()) {
        for row in compare(&a, &b) {
            match row.classification {
                Classification::Improved => prop_assert!(row.delta.unwrap() > 0.0),
                Classification::Declined => prop_assert!(row.delta.unwrap() < 0.0),
                Classification::Unchanged => prop_assert_eq!(row.delta, Some(0.0)),
                Classification::New | Classification::Dropped => prop_assert!(row.delta.is_none()),
            }
        }
    }

    #[test]
    fn prop_movers_sorted_and_capped(a in snapshot_strategy(), b in snapshot_strategy(), n in 0usize..6) {
        let movers = biggest_movers(&compare(&a, &b), n);
        prop_assert!(movers.improved.len() <= n);
        prop_assert!(movers.declined.len() <= n);
        for list in [&movers.improved, &movers.declined] {
            let magnitudes: Vec<f64> = list.iter().map(|r| r.delta.unwrap().abs()).collect();
            prop_assert!(magnitudes.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn prop_classifier_subset_and_disjoint(
        s in snapshot_strategy(),
        impression_threshold in 0u64..5_000,
        low in 0.0f64..0.5,
        gap in 0.001f64..0.5,
    ) {
        let thresholds = Thresholds {
            impression_threshold,
            ctr_low_threshold: low,
            ctr_high_threshold: low + gap,
        };
        let opps = classify(&s, &thresholds);
        let all: Vec<&KeywordRow> = s.rows().collect();
        for bucket in [&opps.high_impression_low_click, &opps.quick_win, &opps.high_ctr] {
            for row in bucket.iter() {
                prop_assert!(all.contains(row));
            }
        }
        for row in &opps.high_ctr {
            prop_assert!(!opps.high_impression_low_click.contains(row));
        }
    }
}
