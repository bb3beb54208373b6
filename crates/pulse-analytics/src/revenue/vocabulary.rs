//! Curated stage vocabularies.
//!
//! Scoring: exact match → 1.0, any vocabulary word present as a substring
//! of the normalized value → 0.90, otherwise 0.0.

/// Words that indicate a WON stage.
pub const WON_VOCABULARY: &[&str] = &[
    "won",
    "win",
    "success",
    "successful",
    "converted",
    "signed",
    "committed",
    "purchased",
    "paid",
    "invoiced",
];

/// Words that indicate a LOST stage.
pub const LOST_VOCABULARY: &[&str] = &[
    "lost",
    "lose",
    "loss",
    "churn",
    "churned",
    "disqualified",
    "unqualified",
    "dead",
    "abandoned",
    "rejected",
    "cancelled",
    "canceled",
    "no_decision",
    "junk",
];

/// Canonical open-pipeline stage keywords, in funnel order. Used to infer
/// a funnel position for OPEN stages by first keyword occurrence.
pub const PIPELINE_ORDER_VOCABULARY: &[&str] = &[
    "new",
    "incoming",
    "prospect",
    "lead",
    "qualification",
    "qualified",
    "discovery",
    "preparation",
    "analysis",
    "demo",
    "presentation",
    "proposal",
    "quote",
    "pricing",
    "negotiation",
    "review",
    "contract",
    "decision",
    "final",
    "closing",
];

/// Score a normalized stage value against one vocabulary.
pub fn score_against(normalized: &str, vocabulary: &[&str]) -> f64 {
    if vocabulary.contains(&normalized) {
        return 1.0;
    }
    if vocabulary.iter().any(|word| normalized.contains(word)) {
        return 0.90;
    }
    0.0
}

/// Funnel position of a normalized OPEN stage: index of the first order
/// keyword it contains, or `usize::MAX` when no keyword matches (sorts
/// after every known stage).
pub fn pipeline_position(normalized: &str) -> usize {
    PIPELINE_ORDER_VOCABULARY
        .iter()
        .position(|word| normalized.contains(word))
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(score_against("won", WON_VOCABULARY), 1.0);
        assert_eq!(score_against("lost", LOST_VOCABULARY), 1.0);
    }

    #[test]
    fn substring_scores_ninety() {
        assert_eq!(score_against("closed_won", WON_VOCABULARY), 0.90);
        assert_eq!(score_against("closed_lost", LOST_VOCABULARY), 0.90);
    }

    #[test]
    fn unrelated_scores_zero() {
        assert_eq!(score_against("preparation", WON_VOCABULARY), 0.0);
        assert_eq!(score_against("preparation", LOST_VOCABULARY), 0.0);
    }

    #[test]
    fn order_positions_follow_the_funnel() {
        assert!(pipeline_position("new_lead") < pipeline_position("negotiation"));
        assert!(pipeline_position("demo_scheduled") < pipeline_position("contract_sent"));
        assert_eq!(pipeline_position("zzz_custom"), usize::MAX);
    }
}
