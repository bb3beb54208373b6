//! `conversion_drop` — win rate fell period-over-period.

use serde_json::json;

use pulse_core::row::Row;
use pulse_core::{MetricError, Severity, Timeframe};

use crate::catalog::compute::{deal_is_lost, deal_is_won, window_filters};

use super::rule_set::AlertRule;
use super::stats::rule_confidence;
use super::types::{AlertContext, AlertEvidence, AlertRecord, AlertType};

pub struct ConversionDropRule;

impl ConversionDropRule {
    /// Resolved deals (won or lost) closed inside the window.
    fn window_stats(
        &self,
        ctx: &AlertContext<'_>,
        timeframe: &Timeframe,
    ) -> Result<(u64, u64), MetricError> {
        let rows = ctx.fetch("crm_deals", window_filters("close_date", timeframe))?;
        let resolved: Vec<&Row> = rows
            .iter()
            .filter(|row| deal_is_won(row, ctx.model) || deal_is_lost(row, ctx.model))
            .collect();
        let won = resolved
            .iter()
            .filter(|row| deal_is_won(row, ctx.model))
            .count() as u64;
        Ok((resolved.len() as u64, won))
    }
}

impl AlertRule for ConversionDropRule {
    fn id(&self) -> &'static str {
        "conversion_drop"
    }

    fn evaluate(&self, ctx: &AlertContext<'_>) -> Result<Vec<AlertRecord>, MetricError> {
        let previous_window = ctx.timeframe.previous();
        let (current_total, current_won) = self.window_stats(ctx, &ctx.timeframe)?;
        let (previous_total, previous_won) = self.window_stats(ctx, &previous_window)?;

        // Thin windows produce rate noise, not signal.
        let floor = ctx.thresholds.effective_min_deals_per_window();
        if current_total < floor || previous_total < floor {
            return Ok(Vec::new());
        }

        let current_rate = current_won as f64 / current_total as f64;
        let previous_rate = previous_won as f64 / previous_total as f64;
        let absolute_drop = previous_rate - current_rate;

        // Strictly greater than the threshold: a drop of exactly 10 pp
        // stays quiet.
        let min_drop = ctx.thresholds.effective_conversion_drop_pp();
        if absolute_drop <= min_drop {
            return Ok(Vec::new());
        }

        let severity = if absolute_drop >= min_drop * 2.0 {
            Severity::Critical
        } else {
            Severity::Warning
        };

        let evidence = AlertEvidence::with_baseline(
            previous_window.label.clone(),
            rule_confidence(current_total.min(previous_total)),
        )
        .count("current_resolved_deals", current_total)
        .count("previous_resolved_deals", previous_total)
        .detail("current_win_rate", json!(current_rate))
        .detail("previous_win_rate", json!(previous_rate))
        .detail("absolute_drop", json!(absolute_drop));

        Ok(vec![AlertRecord {
            alert_type: AlertType::ConversionDrop,
            severity,
            summary: format!(
                "Win rate fell from {:.0}% to {:.0}% ({:.0} points) versus the previous period",
                previous_rate * 100.0,
                current_rate * 100.0,
                absolute_drop * 100.0
            ),
            evidence,
            recommended_actions: vec![
                "Review recently lost deals for a common objection or competitor".to_string(),
                "Check whether deal qualification criteria changed this period".to_string(),
            ],
        }])
    }
}
