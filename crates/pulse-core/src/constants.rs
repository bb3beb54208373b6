//! Named constants shared across the engine.
//!
//! Every threshold that gates an alert or caps a fetch lives here or in
//! [`crate::config`]; nothing is scattered as inline literals.

/// Row-count floor below which evidence trust and confidence are penalized.
pub const LOW_SAMPLE_ROWS: u64 = 10;

/// Confidence cap applied when fewer than [`LOW_SAMPLE_ROWS`] rows backed a value.
pub const LOW_SAMPLE_CONFIDENCE_CAP: f64 = 0.5;

/// Confidence cap applied when any caveat is attached to the evidence.
pub const CAVEAT_CONFIDENCE_CAP: f64 = 0.7;

/// Trust multiplier applied when fewer than [`LOW_SAMPLE_ROWS`] rows exist.
pub const LOW_SAMPLE_TRUST_FACTOR: f64 = 0.5;

/// Default cap on rows sampled per table for trust computation.
pub const DEFAULT_TRUST_SAMPLE_ROWS: usize = 200;

/// Default cap on rows fetched for client-side aggregation (sum/avg/duration).
pub const DEFAULT_AGGREGATION_FETCH_ROWS: usize = 10_000;

/// Default cap on rows scanned by a single alert rule.
pub const DEFAULT_ALERT_SCAN_ROWS: usize = 20_000;

/// Table name prefix for synced CRM entity tables.
pub const CRM_TABLE_PREFIX: &str = "crm_";

/// Synced CRM entity tables.
pub const TABLE_DEALS: &str = "crm_deals";
pub const TABLE_LEADS: &str = "crm_leads";
pub const TABLE_ACTIVITIES: &str = "crm_activities";
pub const TABLE_USERS: &str = "crm_users";

/// Tenant configuration tables.
pub const TABLE_TENANT_METRICS: &str = "tenant_metrics";
pub const TABLE_TENANT_ALERT_RULES: &str = "tenant_alert_rules";
pub const TABLE_REVENUE_MODELS: &str = "revenue_models";

/// Output tables owned by this engine.
pub const TABLE_SNAPSHOTS: &str = "revenue_snapshots";
pub const TABLE_ALERTS: &str = "revenue_alerts";

/// Alert status values understood by the persistence layer. Open alerts are
/// replaced wholesale on each run; dismissed rows are owned by the caller.
pub const ALERT_STATUS_OPEN: &str = "open";
pub const ALERT_STATUS_DISMISSED: &str = "dismissed";
