//! Revenue model builder.
//!
//! Classifies each distinct deal-stage value as WON/LOST/OPEN from
//! vocabulary scoring, infers a funnel order, and emits a proposal with
//! clarification questions when confidence is insufficient. The builder
//! never silently assumes won/lost outcomes: an unconfirmed proposal is
//! never authoritative.

pub mod builder;
pub mod classifier;
pub mod normalize;
pub mod order;
pub mod types;
pub mod vocabulary;

pub use builder::RevenueModelBuilder;
pub use types::{RevenueModel, RevenueModelProposal, StageClass, StageStats};
