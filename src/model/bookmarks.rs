use serde::{Deserialize, Serialize};

use crate::model::node::{Node, NodeId};
use crate::model::tree::Tree;

/// Bookmarked ids in the order they were added.
///
/// Ids may outlive their nodes. [`resolve`](Self::resolve) skips those
/// quietly; dropping them for good is up to whoever performs the delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkIndex {
    ids: Vec<NodeId>,
}

impl BookmarkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from stored ids, dropping repeats.
    pub fn from_ids(ids: impl IntoIterator<Item = NodeId>) -> Self {
        let mut index = Self::new();
        for id in ids {
            if !index.contains(id.as_str()) {
                index.ids.push(id);
            }
        }
        index
    }

    /// Adds the id if absent, removes it if present. Returns whether it is
    /// bookmarked afterwards.
    pub fn toggle(&mut self, id: &NodeId) -> bool {
        if self.remove(id.as_str()) {
            false
        } else {
            self.ids.push(id.clone());
            true
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|stored| stored == id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|stored| stored != id);
        self.ids.len() != before
    }

    /// Live nodes for the stored ids, in stored order.
    pub fn resolve<'t>(&self, tree: &'t Tree) -> Vec<&'t Node> {
        self.ids
            .iter()
            .filter_map(|id| tree.find_node(id.as_str()).ok())
            .collect()
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
