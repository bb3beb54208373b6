//! Vocabulary-based stage classification.

use super::normalize::normalize_stage;
use super::types::{StageClass, StageStats};
use super::vocabulary::{score_against, LOST_VOCABULARY, WON_VOCABULARY};

/// Scores at or above this threshold classify a stage as WON or LOST.
pub const CLASSIFICATION_THRESHOLD: f64 = 0.75;

/// Classify one raw stage value.
///
/// A stage clearing the threshold on both sides is arbitrated to whichever
/// score is higher; an exact tie stays OPEN rather than guessing.
pub fn classify_stage(raw_value: &str, deal_count: u64) -> StageStats {
    let normalized = normalize_stage(raw_value);
    let won_score = score_against(&normalized, WON_VOCABULARY);
    let lost_score = score_against(&normalized, LOST_VOCABULARY);

    let class = match (
        won_score >= CLASSIFICATION_THRESHOLD,
        lost_score >= CLASSIFICATION_THRESHOLD,
    ) {
        (true, false) => StageClass::Won,
        (false, true) => StageClass::Lost,
        (true, true) => {
            if won_score > lost_score {
                StageClass::Won
            } else if lost_score > won_score {
                StageClass::Lost
            } else {
                StageClass::Open
            }
        }
        (false, false) => StageClass::Open,
    };

    StageStats {
        raw_value: raw_value.to_string(),
        normalized,
        deal_count,
        won_score,
        lost_score,
        class,
    }
}
