//! Types for the revenue model builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification of one stage value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageClass {
    Won,
    Lost,
    Open,
}

/// Per-stage evidence gathered while classifying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    /// Raw stage value as synced from the CRM.
    pub raw_value: String,
    /// Normalized vocabulary key.
    pub normalized: String,
    /// Number of deals currently holding this stage.
    pub deal_count: u64,
    /// 0.0–1.0 confidence this stage means WON.
    pub won_score: f64,
    /// 0.0–1.0 confidence this stage means LOST.
    pub lost_score: f64,
    /// Final classification.
    pub class: StageClass,
}

/// A clarification question surfaced to a human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationQuestion {
    /// Stable question id ("won_stages", "lost_stages", "stage_order").
    pub id: String,
    /// Human prompt.
    pub prompt: String,
    /// Selectable options (raw stage values).
    pub options: Vec<String>,
    /// Current best-guess selection.
    pub selected: Vec<String>,
}

/// Confidence breakdown on a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalConfidence {
    pub won_classification: f64,
    pub lost_classification: f64,
    pub stage_order: f64,
    pub overall: f64,
}

/// The confirmed revenue model consumed by metrics and alert rules.
///
/// Stage membership checks are against raw stage values, matching what the
/// deal rows carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueModel {
    pub won_stage_values: Vec<String>,
    pub lost_stage_values: Vec<String>,
    /// Full funnel order: open stages first, then won, then lost.
    pub stage_order: Vec<String>,
    /// True once a human confirmed the won/lost classification.
    pub confirmed: bool,
}

impl RevenueModel {
    pub fn is_won(&self, stage: &str) -> bool {
        self.won_stage_values.iter().any(|s| s == stage)
    }

    pub fn is_lost(&self, stage: &str) -> bool {
        self.lost_stage_values.iter().any(|s| s == stage)
    }

    pub fn is_open(&self, stage: &str) -> bool {
        !self.is_won(stage) && !self.is_lost(stage)
    }

    /// Open stages in funnel order.
    pub fn open_stages(&self) -> Vec<&str> {
        self.stage_order
            .iter()
            .filter(|s| self.is_open(s))
            .map(String::as_str)
            .collect()
    }
}

/// Output of one builder run. Produced fresh on every build; the caller
/// owns any confirmed persisted copy and must never treat an unconfirmed
/// proposal as ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueModelProposal {
    /// Defaulted field mappings (stage/value/close date/owner fields).
    pub field_mappings: BTreeMap<String, String>,
    pub won_stage_values: Vec<String>,
    pub lost_stage_values: Vec<String>,
    /// Inferred funnel order over raw stage values.
    pub stage_order: Vec<String>,
    /// Per-stage classification evidence.
    pub stage_stats: Vec<StageStats>,
    pub confidence: ProposalConfidence,
    /// Human-readable justification per mapping/classification.
    pub rationale: BTreeMap<String, String>,
    pub questions: Vec<ClarificationQuestion>,
    pub total_deals: u64,
    /// True until a human confirms the won/lost classification.
    pub requires_confirmation: bool,
}

impl RevenueModelProposal {
    /// View this proposal as an (unconfirmed) revenue model.
    pub fn as_model(&self) -> RevenueModel {
        RevenueModel {
            won_stage_values: self.won_stage_values.clone(),
            lost_stage_values: self.lost_stage_values.clone(),
            stage_order: self.stage_order.clone(),
            confirmed: false,
        }
    }
}
