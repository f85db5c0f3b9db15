use crate::error::PathError;
use crate::model::node::NodeId;
use crate::model::tree::Tree;

/// Breadcrumb of folder ids from the root to the current folder.
///
/// Never empty; the first element is always the root id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    ids: Vec<NodeId>,
}

impl Default for Breadcrumb {
    fn default() -> Self {
        Self::new()
    }
}

impl Breadcrumb {
    pub fn new() -> Self {
        Self {
            ids: vec![NodeId::root()],
        }
    }

    /// A breadcrumb over a full ancestor chain. `None` unless the chain
    /// starts at the root.
    pub fn from_chain(chain: Vec<NodeId>) -> Option<Self> {
        if !chain.first().is_some_and(NodeId::is_root) {
            return None;
        }
        Some(Self { ids: chain })
    }

    /// Pushes `folder_id` as the new current folder. The caller has already
    /// resolved it as a child folder of the current one.
    pub fn enter(&mut self, folder_id: NodeId) {
        self.ids.push(folder_id);
    }

    /// Keeps the first `index + 1` entries.
    pub fn back_to(&mut self, index: usize) -> Result<(), PathError> {
        if index >= self.ids.len() {
            return Err(PathError::IndexOutOfRange {
                index,
                len: self.ids.len(),
            });
        }
        self.ids.truncate(index + 1);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.ids.truncate(1);
    }

    pub fn current(&self) -> &NodeId {
        // Invariant: `ids` always starts with the root id.
        &self.ids[self.ids.len() - 1]
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn depth(&self) -> usize {
        self.ids.len() - 1
    }

    /// Truncates at the first entry that no longer resolves to a folder.
    /// Returns whether anything was dropped.
    pub fn retain_resolvable(&mut self, tree: &Tree) -> bool {
        let keep = self
            .ids
            .iter()
            .position(|id| tree.find_folder(id.as_str()).is_err())
            .unwrap_or(self.ids.len())
            .max(1);
        let dropped = keep < self.ids.len();
        self.ids.truncate(keep);
        dropped
    }
}
