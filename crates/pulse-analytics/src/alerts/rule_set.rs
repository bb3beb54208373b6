//! Alert rule registry with per-rule failure isolation.
//!
//! The fixed rules are independent of one another and are evaluated in
//! parallel. One rule erroring or panicking must never prevent the others
//! from running or being persisted: failures are logged and skipped, and
//! whatever succeeded is returned.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;

use pulse_core::MetricError;

use super::concentration_risk::ConcentrationRiskRule;
use super::conversion_drop::ConversionDropRule;
use super::forecast_risk::ForecastRiskRule;
use super::pipeline_stall::PipelineStallRule;
use super::rep_slip::RepSlipRule;
use super::types::{AlertContext, AlertRecord};

/// One deterministic alert rule.
pub trait AlertRule: Send + Sync {
    /// Stable rule id (matches the alert type it raises).
    fn id(&self) -> &'static str;

    /// Evaluate against the context. May return zero, one, or several alerts.
    fn evaluate(&self, ctx: &AlertContext<'_>) -> Result<Vec<AlertRecord>, MetricError>;
}

/// Registry of alert rules.
pub struct AlertRuleSet {
    rules: Vec<Box<dyn AlertRule>>,
}

impl AlertRuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn register(&mut self, rule: Box<dyn AlertRule>) {
        self.rules.push(rule);
    }

    pub fn count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluate all rules concurrently with per-rule isolation.
    pub fn run_all(&self, ctx: &AlertContext<'_>) -> Vec<AlertRecord> {
        self.rules
            .par_iter()
            .flat_map(|rule| {
                let outcome = catch_unwind(AssertUnwindSafe(|| rule.evaluate(ctx)));
                match outcome {
                    Ok(Ok(alerts)) => alerts,
                    Ok(Err(e)) => {
                        tracing::error!(rule_id = rule.id(), error = %e, "alert rule failed; skipped");
                        Vec::new()
                    }
                    Err(_) => {
                        tracing::error!(rule_id = rule.id(), "alert rule panicked; skipped");
                        Vec::new()
                    }
                }
            })
            .collect()
    }
}

impl Default for AlertRuleSet {
    fn default() -> Self {
        Self::new()
    }
}

/// The five fixed catalog rules, computed on every snapshot.
pub fn fixed_rule_set() -> AlertRuleSet {
    let mut rules = AlertRuleSet::new();
    rules.register(Box::new(PipelineStallRule));
    rules.register(Box::new(ConversionDropRule));
    rules.register(Box::new(RepSlipRule));
    rules.register(Box::new(ForecastRiskRule));
    rules.register(Box::new(ConcentrationRiskRule));
    rules
}
