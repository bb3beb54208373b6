//! Property tests for the normalizer, classifier, and percentile helper.

use proptest::prelude::*;

use pulse_analytics::alerts::stats::percentile;
use pulse_analytics::revenue::classifier::classify_stage;
use pulse_analytics::revenue::normalize::normalize_stage;

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in "\\PC{0,40}") {
        let once = normalize_stage(&raw);
        let twice = normalize_stage(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalized_values_are_lowercase_word_chars(raw in "\\PC{0,40}") {
        let normalized = normalize_stage(&raw);
        prop_assert!(normalized
            .chars()
            .all(|c| c == '_' || (!c.is_uppercase() && (c.is_alphanumeric() || c == '_'))));
        prop_assert!(!normalized.ends_with('_'));
    }

    #[test]
    fn classification_is_deterministic(raw in "\\PC{1,40}", count in 0u64..10_000) {
        let a = classify_stage(&raw, count);
        let b = classify_stage(&raw, count);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn scores_stay_in_unit_range(raw in "\\PC{1,40}") {
        let stats = classify_stage(&raw, 1);
        prop_assert!((0.0..=1.0).contains(&stats.won_score));
        prop_assert!((0.0..=1.0).contains(&stats.lost_score));
    }

    #[test]
    fn percentile_stays_within_observed_range(
        values in prop::collection::vec(0.0f64..100_000.0, 1..200),
        p in 0.0f64..=1.0,
    ) {
        let result = percentile(&values, p).unwrap();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(result >= min && result <= max, "{result} outside [{min}, {max}]");
    }

    #[test]
    fn percentile_is_monotone_in_p(
        values in prop::collection::vec(0.0f64..100_000.0, 2..100),
        p_low in 0.0f64..=0.5,
        p_high in 0.5f64..=1.0,
    ) {
        let low = percentile(&values, p_low).unwrap();
        let high = percentile(&values, p_high).unwrap();
        prop_assert!(low <= high);
    }
}
