//! `concentration_risk` — one deal or one assignee dominates the pipeline.

use std::collections::BTreeMap;

use serde_json::json;

use pulse_core::row::{field_as_f64, field_as_str, Row};
use pulse_core::{MetricError, Severity};

use crate::catalog::compute::deal_is_open;

use super::rule_set::AlertRule;
use super::stats::{rule_confidence, top_share};
use super::types::{AlertContext, AlertEvidence, AlertRecord, AlertType};

pub struct ConcentrationRiskRule;

impl AlertRule for ConcentrationRiskRule {
    fn id(&self) -> &'static str {
        "concentration_risk"
    }

    fn evaluate(&self, ctx: &AlertContext<'_>) -> Result<Vec<AlertRecord>, MetricError> {
        let deals = ctx.fetch_deals()?;
        let open: Vec<&Row> = deals
            .iter()
            .filter(|row| deal_is_open(row, ctx.model))
            .collect();
        // A one-deal pipeline is trivially concentrated; not a signal.
        if open.len() < 2 {
            return Ok(Vec::new());
        }

        // Share of the single largest deal.
        let deal_values: Vec<(String, f64)> = open
            .iter()
            .map(|row| {
                (
                    field_as_str(row, "id").unwrap_or("unknown").to_string(),
                    field_as_f64(row, "value").unwrap_or(0.0),
                )
            })
            .collect();
        let by_deal = top_share(deal_values.iter().map(|(id, v)| (id.as_str(), *v)));

        // Share of the single most-loaded assignee.
        let mut per_assignee: BTreeMap<String, f64> = BTreeMap::new();
        for row in &open {
            let assignee = field_as_str(row, "assigned_by_id").unwrap_or("unknown");
            *per_assignee.entry(assignee.to_string()).or_insert(0.0) +=
                field_as_f64(row, "value").unwrap_or(0.0);
        }
        // A one-rep book is trivially concentrated; skip that axis.
        let by_assignee = if per_assignee.len() < 2 {
            None
        } else {
            top_share(per_assignee.iter().map(|(id, v)| (id.as_str(), *v)))
        };

        // Report the stronger concentration axis.
        let (axis, label, share) = match (by_deal, by_assignee) {
            (Some((deal, deal_share)), Some((assignee, assignee_share))) => {
                if deal_share >= assignee_share {
                    ("deal", deal.to_string(), deal_share)
                } else {
                    ("assignee", assignee.to_string(), assignee_share)
                }
            }
            (Some((deal, share)), None) => ("deal", deal.to_string(), share),
            (None, Some((assignee, share))) => ("assignee", assignee.to_string(), share),
            (None, None) => return Ok(Vec::new()),
        };

        let warning = ctx.thresholds.effective_concentration_warning_share();
        let critical = ctx.thresholds.effective_concentration_critical_share();
        if share < warning {
            return Ok(Vec::new());
        }
        let severity = if share >= critical {
            Severity::Critical
        } else {
            Severity::Warning
        };

        let evidence =
            AlertEvidence::for_timeframe("current", rule_confidence(open.len() as u64))
                .count("open_deals", open.len() as u64)
                .detail("axis", json!(axis))
                .detail("top_label", json!(label))
                .detail("top_share", json!(share));

        Ok(vec![AlertRecord {
            alert_type: AlertType::ConcentrationRisk,
            severity,
            summary: format!(
                "A single {axis} holds {:.0}% of the open pipeline value",
                share * 100.0
            ),
            evidence,
            recommended_actions: vec![
                "Build contingency plans for the dominant deal or book".to_string(),
                "Diversify sourcing so the pipeline survives one loss".to_string(),
            ],
        }])
    }
}
