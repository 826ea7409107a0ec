//! The exploration tree: arena snapshots and the store that owns them.

pub mod node;
pub mod store;

pub use node::{DeleteOutcome, NodeId, NodeRecord, TrackTree, TreeError, TreeNode};
pub use store::{Snapshot, TreeSeed, TreeStore};
