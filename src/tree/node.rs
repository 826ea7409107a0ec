//! Arena representation of a track tree.
//!
//! Nodes live in a flat map keyed by [`NodeId`]; `children` and `parent`
//! are id relations, never object pointers. A [`TrackTree`] is a value:
//! the store clones it, applies one change, and publishes the clone.

use crate::models::Track;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Locally generated node identifier. Distinct from the track id, since one
/// track may sit at several nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Duplicate node id in tree: {0}")]
    DuplicateNodeId(NodeId),

    #[error("Tree has no root")]
    MissingRoot,

    #[error("Tree has more than one root")]
    MultipleRoots,

    #[error("Node {0} is not reachable from the root")]
    OrphanNode(NodeId),
}

/// One node of the arena.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub id: NodeId,
    pub value: Arc<Track>,
    /// Insertion order is recommendation arrival order.
    pub children: Vec<NodeId>,
    /// `None` only for the root.
    pub parent: Option<NodeId>,
    pub selected: bool,
}

impl NodeRecord {
    fn new(value: Arc<Track>, parent: Option<NodeId>) -> Self {
        Self {
            id: NodeId::generate(),
            value,
            children: Vec::new(),
            parent,
            selected: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Nested form of a tree, as carried in a sphere's `root_node`.
///
/// On the wire it is a flat list of `{id, parentId, value, selected}`
/// records in pre-order, siblings in child order, so document depth stays
/// constant however deep the tree grows.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub value: Track,
    pub children: Vec<TreeNode>,
    pub selected: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlatNodeRef<'a> {
    id: &'a NodeId,
    parent_id: Option<&'a NodeId>,
    value: &'a Track,
    selected: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatNode {
    id: NodeId,
    #[serde(default)]
    parent_id: Option<NodeId>,
    value: Track,
    #[serde(default)]
    selected: bool,
}

impl TreeNode {
    /// A childless, unselected node for `track` with a fresh id.
    pub fn leaf(track: Track) -> Self {
        Self {
            id: NodeId::generate(),
            value: track,
            children: Vec::new(),
            selected: false,
        }
    }

    fn flatten(&self) -> Vec<FlatNodeRef<'_>> {
        let mut out = Vec::new();
        let mut stack: Vec<(&TreeNode, Option<&NodeId>)> = vec![(self, None)];
        while let Some((node, parent)) = stack.pop() {
            out.push(FlatNodeRef {
                id: &node.id,
                parent_id: parent,
                value: &node.value,
                selected: node.selected,
            });
            for child in node.children.iter().rev() {
                stack.push((child, Some(&node.id)));
            }
        }
        out
    }

    /// Rebuild the nested form from flat records. Children keep record order.
    fn unflatten(records: Vec<FlatNode>) -> Result<Self, TreeError> {
        let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), i).is_some() {
                return Err(TreeError::DuplicateNodeId(record.id.clone()));
            }
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
        let mut root = None;
        for (i, record) in records.iter().enumerate() {
            match &record.parent_id {
                None if root.is_none() => root = Some(i),
                None => return Err(TreeError::MultipleRoots),
                Some(parent) => match index.get(parent) {
                    Some(&p) => children[p].push(i),
                    None => return Err(TreeError::OrphanNode(record.id.clone())),
                },
            }
        }
        let root = root.ok_or(TreeError::MissingRoot)?;

        let mut slots: Vec<Option<TreeNode>> = records
            .into_iter()
            .map(|r| {
                Some(TreeNode {
                    id: r.id,
                    value: r.value,
                    children: Vec::new(),
                    selected: r.selected,
                })
            })
            .collect();

        // Post-order: a node takes its children once they are all assembled.
        let mut stack = vec![(root, false)];
        while let Some((i, expanded)) = stack.pop() {
            if !expanded {
                stack.push((i, true));
                stack.extend(children[i].iter().rev().map(|&c| (c, false)));
                continue;
            }
            let kids: Vec<TreeNode> = children[i].iter().filter_map(|&c| slots[c].take()).collect();
            if let Some(node) = slots[i].as_mut() {
                node.children = kids;
            }
        }

        let tree = slots[root].take().ok_or(TreeError::MissingRoot)?;
        // Anything left never hung off the root (a parent cycle).
        if let Some(stray) = slots.iter().flatten().next() {
            return Err(TreeError::OrphanNode(stray.id.clone()));
        }
        Ok(tree)
    }
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.flatten().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TreeNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<FlatNode>::deserialize(deserializer)?;
        TreeNode::unflatten(records).map_err(serde::de::Error::custom)
    }
}

/// What [`TrackTree::delete`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    /// A non-root node was removed; its children now hang off its parent.
    Spliced,
    /// The root was removed and its first child promoted under a fresh id.
    RootPromoted(NodeId),
    /// The root was the only node. The caller must drop the tree.
    Emptied,
}

#[derive(Debug, Clone)]
pub struct TrackTree {
    root: NodeId,
    nodes: HashMap<NodeId, NodeRecord>,
}

impl TrackTree {
    /// A single-node tree rooted at `track`, unselected.
    pub fn new(track: Track) -> Self {
        let root = NodeRecord::new(Arc::new(track), None);
        let root_id = root.id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), root);
        Self {
            root: root_id,
            nodes,
        }
    }

    /// Rebuild the arena from its nested document form.
    pub fn from_nested(root: &TreeNode) -> Result<Self, TreeError> {
        let mut nodes = HashMap::new();
        let mut stack: Vec<(&TreeNode, Option<NodeId>)> = vec![(root, None)];

        while let Some((node, parent)) = stack.pop() {
            if nodes.contains_key(&node.id) {
                return Err(TreeError::DuplicateNodeId(node.id.clone()));
            }
            nodes.insert(
                node.id.clone(),
                NodeRecord {
                    id: node.id.clone(),
                    value: Arc::new(node.value.clone()),
                    children: node.children.iter().map(|c| c.id.clone()).collect(),
                    parent,
                    selected: node.selected,
                },
            );
            for child in node.children.iter().rev() {
                stack.push((child, Some(node.id.clone())));
            }
        }

        Ok(Self {
            root: root.id.clone(),
            nodes,
        })
    }

    /// Nested document form of the whole tree.
    pub fn to_nested(&self) -> TreeNode {
        let mut built: HashMap<&NodeId, TreeNode> = HashMap::with_capacity(self.nodes.len());
        let mut stack: Vec<(&NodeId, bool)> = vec![(&self.root, false)];

        while let Some((id, expanded)) = stack.pop() {
            let Some(record) = self.nodes.get(id) else {
                continue;
            };
            if !expanded {
                stack.push((id, true));
                stack.extend(record.children.iter().rev().map(|c| (c, false)));
                continue;
            }
            let mut node = Self::shell(record);
            node.children = record.children.iter().filter_map(|c| built.remove(c)).collect();
            built.insert(id, node);
        }

        built
            .remove(&self.root)
            .unwrap_or_else(|| Self::shell(self.root()))
    }

    fn shell(record: &NodeRecord) -> TreeNode {
        TreeNode {
            id: record.id.clone(),
            value: (*record.value).clone(),
            children: Vec::new(),
            selected: record.selected,
        }
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    pub fn root(&self) -> &NodeRecord {
        &self.nodes[&self.root]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find_node_by_id(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Children of `id` in order. Empty if the node is unknown.
    pub fn children(&self, id: &NodeId) -> Vec<&NodeRecord> {
        self.nodes
            .get(id)
            .map(|n| n.children.iter().filter_map(|c| self.nodes.get(c)).collect())
            .unwrap_or_default()
    }

    /// Number of hops from the root. Root is depth 0.
    pub fn depth(&self, id: &NodeId) -> Option<usize> {
        let mut node = self.nodes.get(id)?;
        let mut depth = 0;
        while let Some(parent) = &node.parent {
            node = self.nodes.get(parent)?;
            depth += 1;
        }
        Some(depth)
    }

    /// `id` and its ancestors, nearest first, at most `max` entries.
    pub fn lineage(&self, id: &NodeId, max: usize) -> Vec<&NodeRecord> {
        let mut out = Vec::new();
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            if out.len() >= max {
                break;
            }
            out.push(node);
            current = node.parent.as_ref().and_then(|p| self.nodes.get(p));
        }
        out
    }

    /// Breadth-first walk from the root, visiting every node once.
    pub fn iter_bfs(&self) -> Vec<&NodeRecord> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([&self.root]);
        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.nodes.get(id) {
                out.push(node);
                queue.extend(node.children.iter());
            }
        }
        out
    }

    /// Tracks of every selected node, breadth-first.
    pub fn selected_tracks(&self) -> Vec<Track> {
        self.iter_bfs()
            .into_iter()
            .filter(|n| n.selected)
            .map(|n| (*n.value).clone())
            .collect()
    }

    /// Tracks of every node, breadth-first.
    pub fn tracks(&self) -> Vec<Track> {
        self.iter_bfs()
            .into_iter()
            .map(|n| (*n.value).clone())
            .collect()
    }

    /// Check the structural invariants: a single root, every parent link
    /// mirrored in the parent's child list, and every node reachable once.
    pub fn is_consistent(&self) -> bool {
        let roots = self.nodes.values().filter(|n| n.parent.is_none()).count();
        if roots != 1 || self.nodes.get(&self.root).is_none_or(|r| r.parent.is_some()) {
            return false;
        }

        let linked = self.nodes.values().all(|node| match &node.parent {
            Some(parent) => self
                .nodes
                .get(parent)
                .is_some_and(|p| p.children.contains(&node.id)),
            None => true,
        });
        if !linked {
            return false;
        }

        let mut seen = HashSet::new();
        for node in self.iter_bfs() {
            if !seen.insert(&node.id) {
                return false;
            }
        }
        seen.len() == self.nodes.len()
    }

    // ---- mutations, applied by the store on a private clone ----

    pub(crate) fn set_selected(&mut self, id: &NodeId, selected: bool) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) if node.selected != selected => {
                node.selected = selected;
                true
            }
            _ => false,
        }
    }

    /// Append one fresh child per track to `parent` and select the parent.
    /// Returns the new child ids, or `None` if the parent is gone.
    pub(crate) fn append_children(
        &mut self,
        parent: &NodeId,
        tracks: Vec<Track>,
    ) -> Option<Vec<NodeId>> {
        if !self.nodes.contains_key(parent) {
            return None;
        }

        let children: Vec<NodeRecord> = tracks
            .into_iter()
            .map(|t| NodeRecord::new(Arc::new(t), Some(parent.clone())))
            .collect();
        let ids: Vec<NodeId> = children.iter().map(|c| c.id.clone()).collect();

        for child in children {
            self.nodes.insert(child.id.clone(), child);
        }
        let node = self.nodes.get_mut(parent)?;
        node.children.extend(ids.iter().cloned());
        node.selected = true;
        Some(ids)
    }

    /// Replace the value, selection and child list of the node with `updated.id`.
    ///
    /// Only current children may appear in `updated.children`; unknown ids are
    /// ignored and children left out are pruned together with their subtrees.
    pub(crate) fn replace_node(&mut self, updated: &NodeRecord) -> bool {
        let Some(current) = self.nodes.get(&updated.id) else {
            return false;
        };

        let kept: Vec<NodeId> = updated
            .children
            .iter()
            .filter(|c| current.children.contains(c))
            .cloned()
            .collect();
        let dropped: Vec<NodeId> = current
            .children
            .iter()
            .filter(|c| !kept.contains(c))
            .cloned()
            .collect();

        for child in &dropped {
            self.remove_subtree(child);
        }

        if let Some(node) = self.nodes.get_mut(&updated.id) {
            node.value = updated.value.clone();
            node.selected = updated.selected;
            node.children = kept;
        }
        true
    }

    fn remove_subtree(&mut self, id: &NodeId) {
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
            }
        }
    }

    /// Delete a node while keeping every descendant reachable.
    pub(crate) fn delete(&mut self, id: &NodeId) -> DeleteOutcome {
        let Some(node) = self.nodes.remove(id) else {
            return DeleteOutcome::NotFound;
        };

        if let Some(parent_id) = node.parent {
            for child in &node.children {
                if let Some(c) = self.nodes.get_mut(child) {
                    c.parent = Some(parent_id.clone());
                }
            }
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children.retain(|c| c != id);
                parent.children.extend(node.children);
            }
            return DeleteOutcome::Spliced;
        }

        let mut children = node.children.into_iter();
        let Some(first) = children.next() else {
            return DeleteOutcome::Emptied;
        };
        let Some(mut promoted) = self.nodes.remove(&first) else {
            return DeleteOutcome::Emptied;
        };

        // Fresh id so nothing downstream confuses the new root with the old child.
        let new_id = NodeId::generate();
        promoted.id = new_id.clone();
        promoted.parent = None;
        promoted.children.extend(children);

        for child in &promoted.children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = Some(new_id.clone());
            }
        }

        self.nodes.insert(new_id.clone(), promoted);
        self.root = new_id.clone();
        DeleteOutcome::RootPromoted(new_id)
    }
}
