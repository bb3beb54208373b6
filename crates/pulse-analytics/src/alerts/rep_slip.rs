//! `rep_slip` — a rep's activity dropped while their pipeline grew.
//!
//! A leading indicator of disengagement: falling touch volume on a book
//! of business that is getting bigger.

use std::collections::BTreeMap;

use serde_json::json;

use pulse_core::row::{field_as_datetime, field_as_f64, field_as_str, Row};
use pulse_core::{MetricError, Severity, Timeframe};

use crate::catalog::compute::{deal_is_open, window_filters};

use super::rule_set::AlertRule;
use super::stats::rule_confidence;
use super::types::{AlertContext, AlertEvidence, AlertRecord, AlertType};

pub struct RepSlipRule;

impl RepSlipRule {
    /// Activity counts per assignee inside the window.
    fn activity_counts(
        &self,
        ctx: &AlertContext<'_>,
        timeframe: &Timeframe,
    ) -> Result<BTreeMap<String, u64>, MetricError> {
        let rows = ctx.fetch("crm_activities", window_filters("created_at", timeframe))?;
        let mut counts = BTreeMap::new();
        for row in &rows {
            if let Some(assignee) = field_as_str(row, "assigned_by_id") {
                *counts.entry(assignee.to_string()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    /// Open pipeline value per assignee, split into deals created before
    /// the window (baseline) and inside it (growth).
    fn pipeline_split(
        &self,
        ctx: &AlertContext<'_>,
        deals: &[Row],
    ) -> BTreeMap<String, (f64, f64)> {
        let mut split: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for row in deals {
            if !deal_is_open(row, ctx.model) {
                continue;
            }
            let Some(assignee) = field_as_str(row, "assigned_by_id") else {
                continue;
            };
            let value = field_as_f64(row, "value").unwrap_or(0.0);
            let entry = split.entry(assignee.to_string()).or_insert((0.0, 0.0));
            let created_in_window = field_as_datetime(row, "created_at")
                .is_some_and(|created| ctx.timeframe.contains(created));
            if created_in_window {
                entry.1 += value;
            } else {
                entry.0 += value;
            }
        }
        split
    }
}

impl AlertRule for RepSlipRule {
    fn id(&self) -> &'static str {
        "rep_slip"
    }

    fn evaluate(&self, ctx: &AlertContext<'_>) -> Result<Vec<AlertRecord>, MetricError> {
        let previous_window = ctx.timeframe.previous();
        let current = self.activity_counts(ctx, &ctx.timeframe)?;
        let previous = self.activity_counts(ctx, &previous_window)?;
        let deals = ctx.fetch_deals()?;
        let pipeline = self.pipeline_split(ctx, &deals);

        let min_baseline = ctx.thresholds.effective_rep_slip_min_activities();
        let min_drop = ctx.thresholds.effective_rep_slip_activity_drop();
        let min_growth = ctx.thresholds.effective_rep_slip_pipeline_growth();

        let mut slipping: Vec<(String, f64, f64)> = Vec::new();
        for (assignee, &prev_count) in &previous {
            if prev_count < min_baseline {
                continue;
            }
            let curr_count = current.get(assignee).copied().unwrap_or(0);
            let drop = (prev_count as f64 - curr_count as f64) / prev_count as f64;
            if drop < min_drop {
                continue;
            }
            let Some(&(baseline_value, grown_value)) = pipeline.get(assignee) else {
                continue;
            };
            if baseline_value <= 0.0 {
                continue;
            }
            let growth = grown_value / baseline_value;
            if growth >= min_growth {
                slipping.push((assignee.clone(), drop, growth));
            }
        }

        if slipping.is_empty() {
            return Ok(Vec::new());
        }

        let baseline_total: u64 = previous.values().sum();
        let reps: Vec<String> = slipping.iter().map(|(rep, _, _)| rep.clone()).collect();
        let evidence = AlertEvidence::with_baseline(
            previous_window.label.clone(),
            rule_confidence(baseline_total),
        )
        .count("slipping_reps", slipping.len() as u64)
        .count("previous_activities", baseline_total)
        .detail(
            "reps",
            json!(slipping
                .iter()
                .map(|(rep, drop, growth)| json!({
                    "assignee": rep,
                    "activity_drop": drop,
                    "pipeline_growth": growth,
                }))
                .collect::<Vec<_>>()),
        );

        Ok(vec![AlertRecord {
            alert_type: AlertType::RepSlip,
            severity: Severity::Warning,
            summary: format!(
                "Activity dropped at least {:.0}% for {} while their open pipeline grew",
                min_drop * 100.0,
                reps.join(", ")
            ),
            evidence,
            recommended_actions: vec![
                "Check in with the flagged reps on workload and account coverage".to_string(),
                "Rebalance deal assignments if a rep is over capacity".to_string(),
            ],
        }])
    }
}
