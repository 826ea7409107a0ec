//! Data types for the recommendation system.

use crate::models::Track;
use crate::tree::NodeId;
use serde::{Deserialize, Serialize};

/// Result of expanding a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expansion {
    /// The expanded node
    pub node: NodeId,
    /// Ids of the appended children, in arrival order
    pub added: Vec<NodeId>,
    /// Tracks behind `added`
    pub tracks: Vec<Track>,
}

impl Expansion {
    /// Expanded but childless is a valid outcome.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }
}

/// Result of reloading a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "track")]
pub enum ReloadOutcome {
    /// The node now carries this track and has no children.
    Replaced(Track),
    /// No replacement was found, or the node vanished while fetching.
    Unchanged,
}
