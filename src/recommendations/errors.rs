//! Typed errors for the recommendation system.
//!
//! Uses `thiserror` for ergonomic error definitions and implements
//! `Serialize` so errors can cross an IPC boundary cleanly.

use crate::spotify::SpotifyError;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while expanding or reloading a node.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum RecommendationError {
    /// Recommendation provider call failed
    #[error("Recommendation provider error: {0}")]
    Provider(String),

    /// Provider answered with something we could not interpret
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The node to expand is not in the current tree
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Track search failed
    #[error("Search error: {0}")]
    Search(String),
}

impl From<anyhow::Error> for RecommendationError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<SpotifyError>() {
            Some(SpotifyError::ParseError(msg)) => {
                RecommendationError::MalformedResponse(msg.clone())
            }
            _ => RecommendationError::Provider(e.to_string()),
        }
    }
}
