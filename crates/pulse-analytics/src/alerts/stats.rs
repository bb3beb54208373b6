//! Small numeric helpers shared by alert rules.

/// Percentile with linear interpolation between order statistics at rank
/// `(n + 1) * p` (1-based), clamped to the observed range.
///
/// For ages `[2,2,2,50,60,70,80,90,100,110]` the 75th percentile is 92.5.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let rank = (n as f64 + 1.0) * p;
    if rank <= 1.0 {
        return Some(sorted[0]);
    }
    if rank >= n as f64 {
        return Some(sorted[n - 1]);
    }
    let lower = rank.floor() as usize; // 1-based
    let frac = rank - rank.floor();
    Some(sorted[lower - 1] + frac * (sorted[lower] - sorted[lower - 1]))
}

/// Largest share of a total across labelled values.
/// Returns `(label, share)`; `None` when the total is zero or empty.
pub fn top_share<'a, I>(values: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut total = 0.0;
    let mut top: Option<(&str, f64)> = None;
    for (label, value) in values {
        total += value;
        match top {
            Some((_, best)) if best >= value => {}
            _ => top = Some((label, value)),
        }
    }
    if total <= 0.0 {
        return None;
    }
    top.map(|(label, value)| (label, value / total))
}

/// Confidence for a deterministic rule, derived from how much data backed
/// it: none ⇒ 0.0, a thin sample ⇒ 0.5, otherwise 0.85.
pub fn rule_confidence(record_count: u64) -> f64 {
    if record_count == 0 {
        0.0
    } else if record_count < pulse_core::constants::LOW_SAMPLE_ROWS {
        0.5
    } else {
        0.85
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let ages = [2.0, 2.0, 2.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0];
        let p75 = percentile(&ages, 0.75).unwrap();
        assert!((p75 - 92.5).abs() < 1e-9, "expected 92.5, got {p75}");
    }

    #[test]
    fn percentile_clamps_at_the_edges() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 1.0), Some(3.0));
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[7.0], 0.5), Some(7.0));
    }

    #[test]
    fn top_share_finds_the_dominant_label() {
        let shares = vec![
            ("a", 8000.0),
            ("b", 500.0),
            ("c", 500.0),
            ("d", 500.0),
            ("e", 500.0),
        ];
        let (label, share) = top_share(shares).unwrap();
        assert_eq!(label, "a");
        assert!((share - 0.8).abs() < 1e-9);
    }

    #[test]
    fn top_share_requires_a_positive_total() {
        assert_eq!(top_share(vec![("a", 0.0), ("b", 0.0)]), None);
        assert_eq!(top_share(Vec::<(&str, f64)>::new()), None);
    }
}
