//! The session's tree store.
//!
//! Holds the canonical tree as an `Arc<TrackTree>` snapshot. Every mutation
//! clones the latest snapshot under the lock, applies one change, and swaps
//! in the result, so readers only ever see whole snapshots. Callers address
//! nodes by id; a mutation for an id that no longer exists is a silent no-op.

use super::node::{DeleteOutcome, NodeId, NodeRecord, TrackTree, TreeError, TreeNode};
use crate::models::{Sphere, SphereUpdate, Track};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

/// A committed tree snapshot. `None` when no tree is loaded.
pub type Snapshot = Option<Arc<TrackTree>>;

/// What a tree is initialized from.
#[derive(Debug, Clone)]
pub enum TreeSeed {
    /// Start a fresh tree rooted at this track.
    Track(Track),
    /// Resume a persisted sphere.
    Sphere(Box<Sphere>),
}

impl From<Track> for TreeSeed {
    fn from(track: Track) -> Self {
        TreeSeed::Track(track)
    }
}

impl From<Sphere> for TreeSeed {
    fn from(sphere: Sphere) -> Self {
        TreeSeed::Sphere(Box::new(sphere))
    }
}

#[derive(Default)]
struct StoreState {
    tree: Snapshot,
    sphere: Option<Sphere>,
}

pub struct TreeStore {
    state: Mutex<StoreState>,
    snapshots: watch::Sender<Snapshot>,
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStore {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            state: Mutex::new(StoreState::default()),
            snapshots,
        }
    }

    /// Receive every committed snapshot. Compare with `Arc::ptr_eq` to detect change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Current snapshot.
    pub fn root(&self) -> Snapshot {
        self.state.lock().tree.clone()
    }

    /// Current sphere metadata, with `root_node` reflecting the live tree.
    pub fn sphere(&self) -> Option<Sphere> {
        let state = self.state.lock();
        let mut sphere = state.sphere.clone()?;
        if let Some(tree) = &state.tree {
            sphere.root_node = tree.to_nested();
        }
        Some(sphere)
    }

    /// Id of the attached sphere, if any.
    pub fn sphere_id(&self) -> Option<String> {
        self.state.lock().sphere.as_ref().map(|s| s.id.clone())
    }

    /// The attached sphere's id and the live tree, read together.
    /// `None` unless both a sphere and a tree are loaded.
    pub fn root_document(&self) -> Option<(String, TreeNode)> {
        let state = self.state.lock();
        let sphere = state.sphere.as_ref()?;
        let tree = state.tree.as_ref()?;
        Some((sphere.id.clone(), tree.to_nested()))
    }

    /// Load a tree, replacing whatever was loaded before. Returns the root id.
    pub fn initialize_tree(&self, seed: impl Into<TreeSeed>) -> Result<NodeId, TreeError> {
        let (tree, sphere) = match seed.into() {
            TreeSeed::Track(track) => (TrackTree::new(track), None),
            TreeSeed::Sphere(sphere) => (TrackTree::from_nested(&sphere.root_node)?, Some(*sphere)),
        };
        let root_id = tree.root_id().clone();
        let tree = Arc::new(tree);

        let mut state = self.state.lock();
        state.tree = Some(tree.clone());
        state.sphere = sphere;
        self.snapshots.send_replace(Some(tree));

        log::info!("Track tree initialized with root {}", root_id);
        Ok(root_id)
    }

    /// Drop the loaded tree and sphere.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.tree = None;
        state.sphere = None;
        self.snapshots.send_replace(None);
    }

    /// Attach sphere metadata to the loaded tree (e.g. after the store created it).
    pub fn set_sphere(&self, sphere: Sphere) {
        self.state.lock().sphere = Some(sphere);
    }

    /// Apply a metadata patch to the local sphere. The tree is untouched.
    pub fn update_sphere_metadata(&self, update: &SphereUpdate) -> bool {
        let mut state = self.state.lock();
        match state.sphere.as_mut() {
            Some(sphere) => {
                let patch = SphereUpdate {
                    root_node: None,
                    ..update.clone()
                };
                sphere.apply(&patch);
                true
            }
            None => false,
        }
    }

    /// Look a node up in the latest snapshot.
    pub fn find_node_by_id(&self, id: &NodeId) -> Option<NodeRecord> {
        self.state
            .lock()
            .tree
            .as_ref()
            .and_then(|t| t.find_node_by_id(id).cloned())
    }

    /// Replace the node carrying `updated.id`. See [`TrackTree::replace_node`]
    /// for how the child list is interpreted.
    pub fn update_node(&self, updated: &NodeRecord) -> bool {
        self.commit("update_node", |tree| tree.replace_node(updated))
    }

    /// Append children for `tracks` under `parent` and select the parent.
    /// Returns the ids of the new children, or `None` if the parent is gone.
    pub fn add_children_to_node(&self, parent: &NodeId, tracks: Vec<Track>) -> Option<Vec<NodeId>> {
        let mut added = None;
        self.commit("add_children_to_node", |tree| {
            added = tree.append_children(parent, tracks);
            added.is_some()
        });

        match &added {
            Some(ids) => log::debug!("Added {} children to node {}", ids.len(), parent),
            None => log::warn!("Node {} no longer in tree, dropping new children", parent),
        }
        added
    }

    pub fn select_node(&self, id: &NodeId) -> bool {
        self.commit("select_node", |tree| tree.set_selected(id, true))
    }

    pub fn deselect_node(&self, id: &NodeId) -> bool {
        self.commit("deselect_node", |tree| tree.set_selected(id, false))
    }

    /// Delete a node, splicing its children into its parent (or promoting the
    /// first child when the root is deleted).
    pub fn delete_node(&self, id: &NodeId) -> DeleteOutcome {
        let mut state = self.state.lock();
        let Some(current) = state.tree.as_ref() else {
            return DeleteOutcome::NotFound;
        };

        let mut next = (**current).clone();
        let outcome = next.delete(id);
        match outcome {
            DeleteOutcome::NotFound => {}
            DeleteOutcome::Emptied => {
                state.tree = None;
                self.snapshots.send_replace(None);
                log::info!("Deleted last node {}, tree is now empty", id);
            }
            DeleteOutcome::Spliced | DeleteOutcome::RootPromoted(_) => {
                let next = Arc::new(next);
                state.tree = Some(next.clone());
                self.snapshots.send_replace(Some(next));
                log::debug!("Deleted node {} ({:?})", id, outcome);
            }
        }
        outcome
    }

    /// Tracks of every selected node.
    pub fn get_track_list(&self) -> Vec<Track> {
        self.root().map(|t| t.selected_tracks()).unwrap_or_default()
    }

    /// Tracks of every node.
    pub fn get_tracks(&self) -> Vec<Track> {
        self.root().map(|t| t.tracks()).unwrap_or_default()
    }

    /// Clone the latest snapshot, apply `change`, and publish if it reports a change.
    fn commit<F>(&self, operation: &str, change: F) -> bool
    where
        F: FnOnce(&mut TrackTree) -> bool,
    {
        let mut state = self.state.lock();
        let Some(current) = state.tree.as_ref() else {
            log::debug!("{}: no tree loaded", operation);
            return false;
        };

        let mut next = (**current).clone();
        if !change(&mut next) {
            return false;
        }

        let next = Arc::new(next);
        state.tree = Some(next.clone());
        self.snapshots.send_replace(Some(next));
        true
    }
}
