//! `forecast_risk` — late-stage open deals missing forecast hygiene.
//!
//! A deal near the end of the funnel without a close date or value makes
//! every downstream forecast wrong.

use serde_json::json;

use pulse_core::row::{field_as_str, field_is_null, Row};
use pulse_core::{MetricError, Severity};

use crate::catalog::compute::deal_is_open;
use crate::revenue::RevenueModel;

use super::rule_set::AlertRule;
use super::stats::rule_confidence;
use super::types::{AlertContext, AlertEvidence, AlertRecord, AlertType};

pub struct ForecastRiskRule;

/// Stages in the trailing fraction of the open funnel.
fn late_stages<'m>(model: &'m RevenueModel, trailing_fraction: f64) -> Vec<&'m str> {
    let open = model.open_stages();
    if open.is_empty() {
        return Vec::new();
    }
    let tail = ((open.len() as f64 * trailing_fraction).ceil() as usize).max(1);
    open[open.len() - tail..].to_vec()
}

impl AlertRule for ForecastRiskRule {
    fn id(&self) -> &'static str {
        "forecast_risk"
    }

    fn evaluate(&self, ctx: &AlertContext<'_>) -> Result<Vec<AlertRecord>, MetricError> {
        let deals = ctx.fetch_deals()?;
        let open: Vec<&Row> = deals
            .iter()
            .filter(|row| deal_is_open(row, ctx.model))
            .collect();

        // With a confirmed model, only late-stage deals count; without one
        // the check runs across the whole open pipeline.
        let scope_label;
        let candidates: Vec<&Row> = match ctx.model.filter(|m| m.confirmed) {
            Some(model) => {
                let late =
                    late_stages(model, ctx.thresholds.effective_forecast_trailing_fraction());
                scope_label = "late_stage";
                open.iter()
                    .filter(|row| {
                        field_as_str(row, "stage")
                            .is_some_and(|stage| late.contains(&stage))
                    })
                    .copied()
                    .collect()
            }
            None => {
                scope_label = "all_open";
                open.clone()
            }
        };

        let flagged: Vec<&&Row> = candidates
            .iter()
            .filter(|row| field_is_null(row, "close_date") || field_is_null(row, "value"))
            .collect();

        if (flagged.len() as u64) < ctx.thresholds.effective_forecast_min_deals() {
            return Ok(Vec::new());
        }

        let evidence = AlertEvidence::for_timeframe("current", rule_confidence(open.len() as u64))
            .count("open_deals", open.len() as u64)
            .count("checked_deals", candidates.len() as u64)
            .count("flagged_deals", flagged.len() as u64)
            .detail("check_scope", json!(scope_label));

        Ok(vec![AlertRecord {
            alert_type: AlertType::ForecastRisk,
            severity: Severity::Warning,
            summary: format!(
                "{} open deals are missing a close date or value, weakening the forecast",
                flagged.len()
            ),
            evidence,
            recommended_actions: vec![
                "Fill in close dates and values for the flagged deals".to_string(),
                "Make both fields required when a deal passes the proposal stage".to_string(),
            ],
        }])
    }
}
