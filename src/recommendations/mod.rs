//! Recommendation engine for tree expansion.
//!
//! Seeds requests from a node's lineage, then filters the provider's
//! candidates against every track already in the sphere.

pub mod engine;
pub mod errors;
pub mod types;

pub use engine::RecommendationEngine;
pub use errors::RecommendationError;
pub use types::{Expansion, ReloadOutcome};
