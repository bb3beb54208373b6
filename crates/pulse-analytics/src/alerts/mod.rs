//! Deterministic alert rule engine.
//!
//! Two rule families plus a fallback: fixed catalog rules computed every
//! snapshot, tenant-configured rule patterns evaluated over generated
//! metrics and raw tables, and an ad-hoc health check for tenants with no
//! configuration yet. All evaluation is deterministic, bounded, and
//! failure-isolated per rule.

pub mod concentration_risk;
pub mod conversion_drop;
pub mod fallback;
pub mod forecast_risk;
pub mod pipeline_stall;
pub mod rep_slip;
pub mod rule_set;
pub mod stats;
pub mod tenant_rules;
pub mod types;

pub use rule_set::{fixed_rule_set, AlertRule, AlertRuleSet};
pub use tenant_rules::{load_tenant_rules, TenantRuleConfig};
pub use types::{AlertContext, AlertEvidence, AlertRecord, AlertType};

use crate::result::DynamicMetricResult;

/// Compute the full alert set for one run.
///
/// The five fixed rules always run (in parallel, individually isolated).
/// Tenant rules run when configured; when a tenant has neither rules nor
/// generated metrics, the fallback health check runs instead so a
/// brand-new tenant still gets baseline alerts.
pub fn compute_alerts(
    ctx: &AlertContext<'_>,
    dynamic_metrics: &[DynamicMetricResult],
) -> Vec<AlertRecord> {
    let mut alerts = fixed_rule_set().run_all(ctx);

    let tenant_configs = match load_tenant_rules(ctx.store, ctx.scope) {
        Ok(configs) => configs,
        Err(e) => {
            tracing::error!(error = %e, "could not load tenant alert rules");
            Vec::new()
        }
    };

    if tenant_configs.is_empty() && dynamic_metrics.is_empty() {
        alerts.extend(fallback::evaluate_fallback(ctx));
    } else {
        alerts.extend(tenant_rules::evaluate_tenant_rules(
            ctx,
            &tenant_configs,
            dynamic_metrics,
        ));
    }

    alerts
}
