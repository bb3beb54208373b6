//! # pulse-analytics
//!
//! Analytics engine for the Pulse revenue intelligence tool.
//! Contains the metric catalog and validator, the dynamic recipe engine,
//! the deterministic alert rule engine, the revenue model builder, and
//! snapshot orchestration.

pub mod alerts;
pub mod catalog;
pub mod recipes;
pub mod result;
pub mod revenue;
pub mod snapshot;

pub use result::{Comparison, DynamicMetricResult, MetricResult, MetricValue, SeriesPoint};
