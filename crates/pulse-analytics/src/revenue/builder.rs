//! Revenue model builder — single pass over distinct stage values.

use std::collections::BTreeMap;

use serde_json::json;

use pulse_core::constants::{TABLE_DEALS, TABLE_REVENUE_MODELS};
use pulse_core::{
    EngineLimits, FieldFilter, MetricError, SelectQuery, TabularStore, TenantScope,
};

use super::classifier::{classify_stage, CLASSIFICATION_THRESHOLD};
use super::order::{infer_stage_order, STAGE_ORDER_CONFIDENCE};
use super::types::{
    ClarificationQuestion, ProposalConfidence, RevenueModel, RevenueModelProposal, StageClass,
    StageStats,
};

/// Builds revenue model proposals from raw stage data.
pub struct RevenueModelBuilder<'a> {
    store: &'a dyn TabularStore,
    limits: &'a EngineLimits,
}

impl<'a> RevenueModelBuilder<'a> {
    pub fn new(store: &'a dyn TabularStore, limits: &'a EngineLimits) -> Self {
        Self { store, limits }
    }

    /// Build a fresh proposal for the tenant.
    ///
    /// Deterministic: unchanged stage data yields identical stage lists and
    /// order. The proposal is never authoritative until confirmed.
    pub fn build(&self, scope: &TenantScope) -> Result<RevenueModelProposal, MetricError> {
        let total_deals = self.store.count(scope, TABLE_DEALS, &[])?;

        let query = SelectQuery {
            columns: vec!["stage".to_string()],
            limit: Some(self.limits.effective_alert_scan_rows()),
            ..SelectQuery::default()
        };
        let rows = self.store.select(scope, TABLE_DEALS, &query)?;

        // Distinct stage values with deal counts, in deterministic order.
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for row in &rows {
            if let Some(stage) = row.get("stage").and_then(|v| v.as_str()) {
                *counts.entry(stage.to_string()).or_insert(0) += 1;
            }
        }

        let stage_stats: Vec<StageStats> = counts
            .iter()
            .map(|(raw, count)| classify_stage(raw, *count))
            .collect();

        let won_values: Vec<String> = stage_stats
            .iter()
            .filter(|s| s.class == StageClass::Won)
            .map(|s| s.raw_value.clone())
            .collect();
        let lost_values: Vec<String> = stage_stats
            .iter()
            .filter(|s| s.class == StageClass::Lost)
            .map(|s| s.raw_value.clone())
            .collect();
        let stage_order = infer_stage_order(&stage_stats);

        let best_won = stage_stats
            .iter()
            .filter(|s| s.class == StageClass::Won)
            .map(|s| s.won_score)
            .fold(0.0_f64, f64::max);
        let best_lost = stage_stats
            .iter()
            .filter(|s| s.class == StageClass::Lost)
            .map(|s| s.lost_score)
            .fold(0.0_f64, f64::max);

        let confidence = ProposalConfidence {
            won_classification: best_won,
            lost_classification: best_lost,
            stage_order: STAGE_ORDER_CONFIDENCE,
            overall: best_won.min(best_lost),
        };

        let requires_confirmation =
            best_won < CLASSIFICATION_THRESHOLD || best_lost < CLASSIFICATION_THRESHOLD;

        let all_values: Vec<String> = stage_stats.iter().map(|s| s.raw_value.clone()).collect();
        let mut questions = Vec::new();
        if best_won < CLASSIFICATION_THRESHOLD {
            questions.push(ClarificationQuestion {
                id: "won_stages".to_string(),
                prompt: "Which stages mean a deal was won?".to_string(),
                options: all_values.clone(),
                selected: won_values.clone(),
            });
        }
        if best_lost < CLASSIFICATION_THRESHOLD {
            questions.push(ClarificationQuestion {
                id: "lost_stages".to_string(),
                prompt: "Which stages mean a deal was lost?".to_string(),
                options: all_values.clone(),
                selected: lost_values.clone(),
            });
        }
        // Stage order is always an estimate; always ask.
        questions.push(ClarificationQuestion {
            id: "stage_order".to_string(),
            prompt: "Reorder the pipeline stages if this funnel order is wrong.".to_string(),
            options: stage_order.clone(),
            selected: stage_order.clone(),
        });

        let field_mappings = default_field_mappings();
        let rationale = build_rationale(&stage_stats, &won_values, &lost_values);

        Ok(RevenueModelProposal {
            field_mappings,
            won_stage_values: won_values,
            lost_stage_values: lost_values,
            stage_order,
            stage_stats,
            confidence,
            rationale,
            questions,
            total_deals,
            requires_confirmation,
        })
    }
}

/// Default CRM field mappings; every vendor adapter syncs into these names.
fn default_field_mappings() -> BTreeMap<String, String> {
    let mut mappings = BTreeMap::new();
    mappings.insert("stage_field".to_string(), "stage".to_string());
    mappings.insert("value_field".to_string(), "value".to_string());
    mappings.insert("close_date_field".to_string(), "close_date".to_string());
    mappings.insert("owner_field".to_string(), "assigned_by_id".to_string());
    mappings
}

fn build_rationale(
    stats: &[StageStats],
    won: &[String],
    lost: &[String],
) -> BTreeMap<String, String> {
    let mut rationale = BTreeMap::new();
    rationale.insert(
        "stage_field".to_string(),
        "Standard synced column holding the raw pipeline stage value.".to_string(),
    );
    rationale.insert(
        "won_stages".to_string(),
        if won.is_empty() {
            "No stage value matched the won vocabulary; confirmation required.".to_string()
        } else {
            format!("Matched won vocabulary: {}", won.join(", "))
        },
    );
    rationale.insert(
        "lost_stages".to_string(),
        if lost.is_empty() {
            "No stage value matched the lost vocabulary; confirmation required.".to_string()
        } else {
            format!("Matched lost vocabulary: {}", lost.join(", "))
        },
    );
    rationale.insert(
        "stage_order".to_string(),
        format!(
            "Order inferred from stage-name keywords over {} distinct stages; \
             transition history is not available.",
            stats.len()
        ),
    );
    rationale
}

/// Load the confirmed revenue model for a tenant, if one was persisted.
///
/// Unconfirmed rows are ignored: an unconfirmed proposal must never be
/// treated as ground truth.
pub fn load_confirmed_model(
    store: &dyn TabularStore,
    scope: &TenantScope,
) -> Result<Option<RevenueModel>, MetricError> {
    let query = SelectQuery::filtered(vec![FieldFilter::eq("confirmed", json!(true))])
        .with_limit(1);
    let rows = store.select(scope, TABLE_REVENUE_MODELS, &query)?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    let model = RevenueModel {
        won_stage_values: string_list(row.get("won_stage_values")),
        lost_stage_values: string_list(row.get("lost_stage_values")),
        stage_order: string_list(row.get("stage_order")),
        confirmed: true,
    };
    Ok(Some(model))
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
