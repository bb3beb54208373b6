//! `pipeline_stall` — open deals stale past the 75th percentile age.

use serde_json::json;

use pulse_core::row::field_as_datetime;
use pulse_core::{MetricError, Severity};

use crate::catalog::compute::deal_is_open;

use super::rule_set::AlertRule;
use super::stats::{percentile, rule_confidence};
use super::types::{AlertContext, AlertEvidence, AlertRecord, AlertType};

pub struct PipelineStallRule;

impl AlertRule for PipelineStallRule {
    fn id(&self) -> &'static str {
        "pipeline_stall"
    }

    fn evaluate(&self, ctx: &AlertContext<'_>) -> Result<Vec<AlertRecord>, MetricError> {
        let deals = ctx.fetch_deals()?;
        // Staleness ages in days, per open deal with a modification stamp.
        let ages: Vec<f64> = deals
            .iter()
            .filter(|row| deal_is_open(row, ctx.model))
            .filter_map(|row| field_as_datetime(row, "modified_at"))
            .map(|modified| (ctx.now - modified).num_seconds() as f64 / 86_400.0)
            .collect();

        let Some(p75) = percentile(&ages, 0.75) else {
            return Ok(Vec::new());
        };
        let stalled = ages.iter().filter(|age| **age > p75).count() as u64;
        let open = ages.len() as u64;
        let share = stalled as f64 / open as f64;

        if stalled < ctx.thresholds.effective_stall_min_deals()
            || share < ctx.thresholds.effective_stall_min_share()
        {
            return Ok(Vec::new());
        }

        let evidence = AlertEvidence::for_timeframe("current", rule_confidence(open))
            .count("open_deals", open)
            .count("stalled_deals", stalled)
            .detail("stale_age_p75_days", json!(p75))
            .detail("stalled_share", json!(share));

        Ok(vec![AlertRecord {
            alert_type: AlertType::PipelineStall,
            severity: Severity::Warning,
            summary: format!(
                "{stalled} of {open} open deals have gone quiet for longer than \
                 {p75:.0} days ({:.0}% of the open pipeline)",
                share * 100.0
            ),
            evidence,
            recommended_actions: vec![
                "Review the stalled deals and schedule a next step for each".to_string(),
                "Close out deals that are no longer active to clean the pipeline".to_string(),
            ],
        }])
    }
}
