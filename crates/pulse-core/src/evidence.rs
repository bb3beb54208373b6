//! Evidence model — the provenance bundle attached to every computed value.
//!
//! Trust and confidence are always derived from evidence, never asserted
//! directly by a metric author. Trust reflects data quality (population,
//! null rates); confidence additionally reflects computation caveats.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{
    CAVEAT_CONFIDENCE_CAP, LOW_SAMPLE_CONFIDENCE_CAP, LOW_SAMPLE_ROWS, LOW_SAMPLE_TRUST_FACTOR,
};

/// Provenance for one computed metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvidence {
    /// Table population for the tenant (matching rows, before any fetch cap).
    pub row_count: u64,
    /// Rows actually inspected (bounded fetches make this < row_count).
    pub sampled_rows: u64,
    /// Fields whose null rates were evaluated.
    pub fields_evaluated: Vec<String>,
    /// Field → fraction null. 0.0 = perfectly populated.
    pub null_rates: BTreeMap<String, f64>,
    /// Derived 0.0–1.0 trust in the underlying data.
    pub data_trust_score: f64,
    /// Human label of the window the value covers.
    pub timeframe: String,
    /// Caveats and free-text notes ("Denominator is zero", "low sample size").
    pub computation_notes: SmallVec<[String; 2]>,
}

impl MetricEvidence {
    /// Evidence for a window with no matching rows. Trust is zero by invariant.
    pub fn empty(timeframe: impl Into<String>) -> Self {
        Self {
            row_count: 0,
            sampled_rows: 0,
            fields_evaluated: Vec::new(),
            null_rates: BTreeMap::new(),
            data_trust_score: 0.0,
            timeframe: timeframe.into(),
            computation_notes: SmallVec::new(),
        }
    }

    /// Build evidence from counts and null rates, deriving the trust score.
    pub fn from_counts(
        timeframe: impl Into<String>,
        row_count: u64,
        sampled_rows: u64,
        null_rates: BTreeMap<String, f64>,
    ) -> Self {
        let fields_evaluated: Vec<String> = null_rates.keys().cloned().collect();
        let mut evidence = Self {
            row_count,
            sampled_rows,
            fields_evaluated,
            null_rates,
            data_trust_score: 0.0,
            timeframe: timeframe.into(),
            computation_notes: SmallVec::new(),
        };
        evidence.data_trust_score = evidence.derive_trust();
        evidence
    }

    /// Attach a caveat note.
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.computation_notes.push(note.into());
    }

    /// Trust derivation. Zero rows pin trust to 0.0; average null rate
    /// discounts it; a low sample multiplies it down. Trust is only ever
    /// capped downward by sparse data, never inflated.
    pub fn derive_trust(&self) -> f64 {
        if self.row_count == 0 {
            return 0.0;
        }
        let avg_null_rate = if self.null_rates.is_empty() {
            0.0
        } else {
            self.null_rates.values().sum::<f64>() / self.null_rates.len() as f64
        };
        let mut trust = 1.0 - avg_null_rate;
        if self.row_count < LOW_SAMPLE_ROWS {
            trust *= LOW_SAMPLE_TRUST_FACTOR;
        }
        trust.clamp(0.0, 1.0)
    }

    /// Confidence in the computed value, derived purely from this evidence:
    /// zero rows ⇒ 0.0; fewer than 10 rows ⇒ capped at 0.5; any caveat
    /// present ⇒ capped at 0.7.
    pub fn confidence(&self) -> f64 {
        if self.row_count == 0 {
            return 0.0;
        }
        let mut confidence = self.data_trust_score;
        if self.row_count < LOW_SAMPLE_ROWS {
            confidence = confidence.min(LOW_SAMPLE_CONFIDENCE_CAP);
        }
        if !self.computation_notes.is_empty() {
            confidence = confidence.min(CAVEAT_CONFIDENCE_CAP);
        }
        confidence
    }
}
