//! Metric validation — runs before any aggregation touches row data.
//!
//! Check order is fixed: unknown key, then disallowed dimension, then
//! table population. The dimension check must fire even when the required
//! tables are empty.

use std::cell::RefCell;

use pulse_core::{FxHashMap, MetricEvidence, TabularStore, TenantScope};

use super::definitions::{find_metric, metric_keys, MetricDefinition};

/// Outcome of one validation: a structured verdict, never an exception.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub reason: Option<String>,
    pub evidence: Option<MetricEvidence>,
}

impl ValidationOutcome {
    fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
            evidence: None,
        }
    }

    fn pass(evidence: MetricEvidence) -> Self {
        Self {
            ok: true,
            reason: None,
            evidence: Some(evidence),
        }
    }
}

/// Validates metrics for one pass.
///
/// The population-count cache lives on the instance and is scoped to that
/// pass: build one validator per catalog view, drop it when done. It must
/// not be shared across tenants or reused across calls.
pub struct MetricValidator<'a> {
    store: &'a dyn TabularStore,
    count_cache: RefCell<FxHashMap<String, u64>>,
}

impl<'a> MetricValidator<'a> {
    pub fn new(store: &'a dyn TabularStore) -> Self {
        Self {
            store,
            count_cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Validate a metric key and optional breakdown dimension.
    pub fn validate(
        &self,
        scope: &TenantScope,
        metric_key: &str,
        dimension: Option<&str>,
    ) -> ValidationOutcome {
        let Some(def) = find_metric(metric_key) else {
            return ValidationOutcome::fail(format!(
                "Unknown metric '{metric_key}'. Valid metrics: {}",
                metric_keys().join(", ")
            ));
        };

        if let Some(dimension) = dimension {
            if !def.allowed_dimensions.contains(&dimension) {
                let allowed = if def.allowed_dimensions.is_empty() {
                    "none".to_string()
                } else {
                    def.allowed_dimensions.join(", ")
                };
                return ValidationOutcome::fail(format!(
                    "Dimension '{dimension}' is not allowed for metric '{metric_key}'. \
                     Allowed dimensions: {allowed}"
                ));
            }
        }

        self.check_population(scope, def)
    }

    fn check_population(
        &self,
        scope: &TenantScope,
        def: &MetricDefinition,
    ) -> ValidationOutcome {
        let mut empty_tables = Vec::new();
        let mut total_rows = 0u64;
        let mut evidence = MetricEvidence::empty("current");

        for table in def.required_tables {
            match self.cached_count(scope, table) {
                Ok(count) => {
                    if count == 0 {
                        empty_tables.push(*table);
                    }
                    total_rows += count;
                    evidence.add_note(format!("{table}: {count} rows"));
                }
                Err(e) => {
                    return ValidationOutcome::fail(format!(
                        "Could not verify population of {table}: {e}"
                    ));
                }
            }
        }

        if !empty_tables.is_empty() {
            return ValidationOutcome::fail(format!(
                "No data synced yet for required table(s): {}",
                empty_tables.join(", ")
            ));
        }

        evidence.row_count = total_rows;
        evidence.data_trust_score = evidence.derive_trust();
        ValidationOutcome::pass(evidence)
    }

    /// Population count with a per-pass cache, so validating the whole
    /// catalog issues one count per table.
    fn cached_count(
        &self,
        scope: &TenantScope,
        table: &str,
    ) -> Result<u64, pulse_core::StoreError> {
        let cache_key = format!(
            "{}/{}/{}",
            scope.tenant_id, scope.crm_source, table
        );
        if let Some(count) = self.count_cache.borrow().get(&cache_key) {
            tracing::debug!(table, "population cache hit");
            return Ok(*count);
        }
        let count = self.store.count(scope, table, &[])?;
        self.count_cache.borrow_mut().insert(cache_key, count);
        Ok(count)
    }
}
