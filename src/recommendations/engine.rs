//! Recommendation engine implementation.
//!
//! Expands a tree node by:
//! 1. Deriving seed tracks from the node and its nearest ancestors
//! 2. Requesting fixed-size candidate batches from the provider
//! 3. Keeping candidates that have a preview and whose name is new to the
//!    whole tree, retrying until the limit is met or attempts run out
//!
//! The tree is never locked across a provider call. Commits re-resolve the
//! node by id, so a node deleted mid-fetch just drops the result.

use crate::config::RecommendationConfig;
use crate::models::Track;
use crate::providers::{RecommendationProvider, RecommendationQuery};
use crate::recommendations::errors::RecommendationError;
use crate::recommendations::types::{Expansion, ReloadOutcome};
use crate::tree::{NodeId, TrackTree, TreeStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Children requested for a node that has none yet, at the root.
const BASE_EXPAND_SIZE: usize = 4;

pub struct RecommendationEngine {
    provider: Arc<dyn RecommendationProvider>,
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(provider: Arc<dyn RecommendationProvider>, config: RecommendationConfig) -> Self {
        Self { provider, config }
    }

    /// The node's track followed by its ancestors', nearest first,
    /// capped at `max_seed_tracks`.
    pub fn seed_tracks(&self, tree: &TrackTree, node: &NodeId) -> Vec<Track> {
        tree.lineage(node, self.config.max_seed_tracks)
            .into_iter()
            .map(|n| (*n.value).clone())
            .collect()
    }

    /// How many tracks an expand of `node` should ask for: one more if it
    /// already has children, otherwise fewer the deeper it sits.
    pub fn expand_limit(tree: &TrackTree, node: &NodeId) -> usize {
        match tree.find_node_by_id(node) {
            Some(n) if !n.children.is_empty() => 1,
            Some(_) => {
                let depth = tree.depth(node).unwrap_or(0);
                BASE_EXPAND_SIZE.saturating_sub(depth).max(1)
            }
            None => 0,
        }
    }

    /// Fetch up to `limit` tracks that are new to the whole tree.
    ///
    /// Returns fewer (possibly zero) when the provider runs dry. A provider
    /// failure aborts the remaining attempts and discards what was gathered.
    pub async fn generate_recommendations(
        &self,
        store: &TreeStore,
        node: &NodeId,
        limit: usize,
    ) -> Result<Vec<Track>, RecommendationError> {
        let tree = store
            .root()
            .ok_or_else(|| RecommendationError::NodeNotFound(node.to_string()))?;
        if !tree.contains(node) {
            return Err(RecommendationError::NodeNotFound(node.to_string()));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let seeds = self.seed_tracks(&tree, node);
        let query = RecommendationQuery::new(
            self.config.batch_size,
            seeds.iter().map(|t| t.id.clone()).collect(),
        );

        // Names seen anywhere in the tree, not just this branch.
        let mut seen: HashSet<String> = tree.tracks().into_iter().map(|t| t.name).collect();
        let mut accepted: Vec<Track> = Vec::with_capacity(limit);

        for attempt in 1..=self.config.max_attempts {
            if accepted.len() >= limit {
                break;
            }

            let candidates = self.provider.get_recommendations(&query).await.map_err(|e| {
                log::warn!(
                    "Recommendation attempt {}/{} for node {} failed: {}",
                    attempt,
                    self.config.max_attempts,
                    node,
                    e
                );
                RecommendationError::from(e)
            })?;

            let offered = candidates.len();
            for track in candidates {
                if !track.has_preview() || seen.contains(&track.name) {
                    continue;
                }
                seen.insert(track.name.clone());
                accepted.push(track);
                if accepted.len() >= limit {
                    break;
                }
            }

            log::debug!(
                "Attempt {}/{} for node {}: {} offered, {}/{} accepted so far",
                attempt,
                self.config.max_attempts,
                node,
                offered,
                accepted.len(),
                limit
            );
        }

        accepted.truncate(limit);
        Ok(accepted)
    }

    /// Generate recommendations for `node` and append them as its children.
    /// The node is selected even when nothing new was found.
    pub async fn get_recommendations(
        &self,
        store: &TreeStore,
        node: &NodeId,
        limit: usize,
    ) -> Result<Expansion, RecommendationError> {
        let tracks = self.generate_recommendations(store, node, limit).await?;

        let added = store
            .add_children_to_node(node, tracks.clone())
            .unwrap_or_default();
        let tracks = if added.is_empty() { Vec::new() } else { tracks };

        log::info!("Expanded node {} with {} tracks", node, added.len());
        Ok(Expansion {
            node: node.clone(),
            added,
            tracks,
        })
    }

    /// Swap the node's track for one fresh recommendation and drop its subtree.
    /// Leaves the node alone when nothing new turns up.
    pub async fn reload(
        &self,
        store: &TreeStore,
        node: &NodeId,
    ) -> Result<ReloadOutcome, RecommendationError> {
        let mut tracks = self.generate_recommendations(store, node, 1).await?;
        let Some(track) = tracks.pop() else {
            log::info!("No replacement found for node {}, leaving it unchanged", node);
            return Ok(ReloadOutcome::Unchanged);
        };

        let Some(mut current) = store.find_node_by_id(node) else {
            log::warn!("Node {} disappeared during reload", node);
            return Ok(ReloadOutcome::Unchanged);
        };
        current.value = Arc::new(track.clone());
        current.children.clear();

        if !store.update_node(&current) {
            return Ok(ReloadOutcome::Unchanged);
        }

        log::info!("Reloaded node {} with '{}'", node, track.name);
        Ok(ReloadOutcome::Replaced(track))
    }

    /// Search the catalog for candidate seed tracks. A blank query yields nothing.
    pub async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, RecommendationError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.provider
            .search_tracks(query, self.config.search_limit)
            .await
            .map_err(|e| RecommendationError::Search(e.to_string()))
    }
}
