//! Ad-hoc fallback health check.
//!
//! A brand-new tenant has no generated metrics and no alert rules yet;
//! these four baseline checks run instead so the dashboard is never
//! silent. Each check is isolated: one failing does not stop the rest.

use chrono::Duration;
use serde_json::json;

use pulse_core::row::{field_as_datetime, field_as_f64, field_as_str, field_is_null, Row};
use pulse_core::{MetricError, Severity};

use crate::catalog::compute::{deal_is_lost, deal_is_open, deal_is_won};

use super::stats::{rule_confidence, top_share};
use super::types::{AlertContext, AlertEvidence, AlertRecord, AlertType};

/// Staleness cutoff for the fallback stale-deal check.
const FALLBACK_STALE_DAYS: i64 = 30;

/// Stale/missing share beyond which the fallback checks flag.
const FALLBACK_SHARE: f64 = 0.5;

/// Minimum resolved deals before the win-rate check speaks.
const FALLBACK_MIN_RESOLVED: u64 = 10;

/// Run the four baseline checks. Used only when the tenant has neither
/// alert rules nor generated metrics.
pub fn evaluate_fallback(ctx: &AlertContext<'_>) -> Vec<AlertRecord> {
    let deals = match ctx.fetch_deals() {
        Ok(deals) => deals,
        Err(e) => {
            tracing::error!(error = %e, "fallback health check could not read deals");
            return Vec::new();
        }
    };

    let checks: [fn(&AlertContext<'_>, &[Row]) -> Result<Option<AlertRecord>, MetricError>; 4] = [
        stale_deals,
        missing_fields,
        pipeline_concentration,
        low_win_rate,
    ];

    let mut alerts = Vec::new();
    for check in checks {
        match check(ctx, &deals) {
            Ok(Some(alert)) => alerts.push(alert),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "fallback check failed; skipped");
            }
        }
    }
    alerts
}

fn stale_deals(
    ctx: &AlertContext<'_>,
    deals: &[Row],
) -> Result<Option<AlertRecord>, MetricError> {
    let open: Vec<&Row> = deals
        .iter()
        .filter(|row| deal_is_open(row, ctx.model))
        .collect();
    if open.is_empty() {
        return Ok(None);
    }
    let cutoff = ctx.now - Duration::days(FALLBACK_STALE_DAYS);
    let stale = open
        .iter()
        .filter(|row| field_as_datetime(row, "modified_at").is_some_and(|m| m < cutoff))
        .count();
    let share = stale as f64 / open.len() as f64;
    if share < FALLBACK_SHARE {
        return Ok(None);
    }
    Ok(Some(AlertRecord {
        alert_type: AlertType::StaleDeals,
        severity: Severity::Warning,
        summary: format!(
            "{stale} of {} open deals have not been touched in {FALLBACK_STALE_DAYS}+ days",
            open.len()
        ),
        evidence: AlertEvidence::for_timeframe("current", rule_confidence(open.len() as u64))
            .count("open_deals", open.len() as u64)
            .count("stale_deals", stale as u64)
            .detail("stale_share", json!(share)),
        recommended_actions: vec!["Work or close out the untouched deals".to_string()],
    }))
}

fn missing_fields(
    ctx: &AlertContext<'_>,
    deals: &[Row],
) -> Result<Option<AlertRecord>, MetricError> {
    let open: Vec<&Row> = deals
        .iter()
        .filter(|row| deal_is_open(row, ctx.model))
        .collect();
    if open.is_empty() {
        return Ok(None);
    }
    let missing = open
        .iter()
        .filter(|row| field_is_null(row, "value") || field_is_null(row, "close_date"))
        .count();
    let share = missing as f64 / open.len() as f64;
    if share < FALLBACK_SHARE {
        return Ok(None);
    }
    Ok(Some(AlertRecord {
        alert_type: AlertType::MissingFields,
        severity: Severity::Warning,
        summary: format!(
            "{missing} of {} open deals are missing a value or close date",
            open.len()
        ),
        evidence: AlertEvidence::for_timeframe("current", rule_confidence(open.len() as u64))
            .count("open_deals", open.len() as u64)
            .count("incomplete_deals", missing as u64)
            .detail("missing_share", json!(share)),
        recommended_actions: vec![
            "Fill in deal values and close dates so metrics can be trusted".to_string(),
        ],
    }))
}

fn pipeline_concentration(
    ctx: &AlertContext<'_>,
    deals: &[Row],
) -> Result<Option<AlertRecord>, MetricError> {
    let mut per_assignee: std::collections::BTreeMap<String, f64> = Default::default();
    for row in deals.iter().filter(|row| deal_is_open(row, ctx.model)) {
        let assignee = field_as_str(row, "assigned_by_id").unwrap_or("unknown");
        *per_assignee.entry(assignee.to_string()).or_insert(0.0) +=
            field_as_f64(row, "value").unwrap_or(0.0);
    }
    if per_assignee.len() < 2 {
        return Ok(None);
    }
    let Some((label, share)) = top_share(per_assignee.iter().map(|(k, v)| (k.as_str(), *v)))
    else {
        return Ok(None);
    };
    if share < ctx.thresholds.effective_concentration_warning_share() {
        return Ok(None);
    }
    Ok(Some(AlertRecord {
        alert_type: AlertType::PipelineConcentration,
        severity: Severity::Info,
        summary: format!(
            "One assignee ('{label}') holds {:.0}% of open pipeline value",
            share * 100.0
        ),
        evidence: AlertEvidence::for_timeframe(
            "current",
            rule_confidence(per_assignee.len() as u64),
        )
        .count("assignees", per_assignee.len() as u64)
        .detail("top_assignee", json!(label))
        .detail("top_share", json!(share)),
        recommended_actions: vec!["Spread new deals across the team".to_string()],
    }))
}

fn low_win_rate(
    ctx: &AlertContext<'_>,
    deals: &[Row],
) -> Result<Option<AlertRecord>, MetricError> {
    let resolved: Vec<&Row> = deals
        .iter()
        .filter(|row| deal_is_won(row, ctx.model) || deal_is_lost(row, ctx.model))
        .collect();
    if (resolved.len() as u64) < FALLBACK_MIN_RESOLVED {
        return Ok(None);
    }
    let won = resolved
        .iter()
        .filter(|row| deal_is_won(row, ctx.model))
        .count();
    let rate = won as f64 / resolved.len() as f64;
    if rate >= ctx.thresholds.effective_low_win_rate() {
        return Ok(None);
    }
    Ok(Some(AlertRecord {
        alert_type: AlertType::LowWinRate,
        severity: Severity::Warning,
        summary: format!(
            "All-time win rate is {:.0}% across {} resolved deals",
            rate * 100.0,
            resolved.len()
        ),
        evidence: AlertEvidence::for_timeframe("all_time", rule_confidence(resolved.len() as u64))
            .count("resolved_deals", resolved.len() as u64)
            .count("won_deals", won as u64)
            .detail("win_rate", json!(rate)),
        recommended_actions: vec![
            "Review qualification criteria; too many weak deals enter the pipeline".to_string(),
        ],
    }))
}
