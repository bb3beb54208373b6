//! Funnel order inference.
//!
//! Transition history is not synced, so order is estimated from the
//! canonical pipeline vocabulary: OPEN stages sort by first keyword
//! position (ties broken by higher deal count, then raw value for
//! determinism), WON stages trail all open stages, LOST stages trail WON.

use super::types::{StageClass, StageStats};
use super::vocabulary::pipeline_position;

/// Fixed confidence reported for any inferred stage order.
pub const STAGE_ORDER_CONFIDENCE: f64 = 0.6;

/// Infer the full funnel order over raw stage values.
pub fn infer_stage_order(stats: &[StageStats]) -> Vec<String> {
    let mut open: Vec<&StageStats> = stats
        .iter()
        .filter(|s| s.class == StageClass::Open)
        .collect();
    open.sort_by(|a, b| {
        pipeline_position(&a.normalized)
            .cmp(&pipeline_position(&b.normalized))
            .then(b.deal_count.cmp(&a.deal_count))
            .then(a.raw_value.cmp(&b.raw_value))
    });

    let mut won: Vec<&StageStats> = stats
        .iter()
        .filter(|s| s.class == StageClass::Won)
        .collect();
    won.sort_by(|a, b| b.deal_count.cmp(&a.deal_count).then(a.raw_value.cmp(&b.raw_value)));

    let mut lost: Vec<&StageStats> = stats
        .iter()
        .filter(|s| s.class == StageClass::Lost)
        .collect();
    lost.sort_by(|a, b| b.deal_count.cmp(&a.deal_count).then(a.raw_value.cmp(&b.raw_value)));

    open.iter()
        .chain(won.iter())
        .chain(lost.iter())
        .map(|s| s.raw_value.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revenue::classifier::classify_stage;

    fn stats(values: &[(&str, u64)]) -> Vec<StageStats> {
        values
            .iter()
            .map(|(raw, count)| classify_stage(raw, *count))
            .collect()
    }

    #[test]
    fn open_stages_sort_by_funnel_position() {
        let stats = stats(&[
            ("Negotiation", 5),
            ("New Lead", 20),
            ("Proposal Sent", 8),
            ("WON", 12),
            ("LOST", 9),
        ]);
        let order = infer_stage_order(&stats);
        assert_eq!(
            order,
            vec!["New Lead", "Proposal Sent", "Negotiation", "WON", "LOST"]
        );
    }

    #[test]
    fn unknown_stages_break_ties_by_deal_count() {
        let stats = stats(&[("Alpha Phase", 3), ("Beta Phase", 30)]);
        let order = infer_stage_order(&stats);
        assert_eq!(order, vec!["Beta Phase", "Alpha Phase"]);
    }

    #[test]
    fn won_precedes_lost_at_the_tail() {
        let stats = stats(&[("LOST", 1), ("WON", 1), ("Demo", 1)]);
        let order = infer_stage_order(&stats);
        assert_eq!(order, vec!["Demo", "WON", "LOST"]);
    }
}
