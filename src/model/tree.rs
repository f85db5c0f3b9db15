//! The tree engine.
//!
//! The tree is an owned recursive structure whose folders hold `Arc` children.
//! Mutations copy the path from the root to the target with `Arc::make_mut`,
//! so a [`Tree`] handed out by [`TreeEngine::snapshot`] never changes under
//! its holder.
//!
//! # Invariants
//! - The root is a folder with id [`ROOT_ID`] and is never removed.
//! - Ids are unique across the whole tree.
//! - Lookups walk the tree in pre-order: a folder, then each child in order,
//!   descending into child folders before moving to the next sibling.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{SnapshotError, TreeError};
use crate::model::id::{IdSource, RandomIds};
use crate::model::node::{File, Folder, Node, NodeId, NodeKind, Note, ROOT_ID, normalize_name};
use crate::model::payload::PayloadKey;

/// Immutable point-in-time view of the whole tree. Cloning is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    root: Arc<Node>,
}

impl Tree {
    /// A tree holding only the root folder.
    pub fn new(root_name: &str) -> Self {
        Self {
            root: Arc::new(Node::Folder(Folder::root(root_name))),
        }
    }

    /// Adopts a deserialized root after checking the tree invariants.
    pub fn from_root(root: Node) -> Result<Self, SnapshotError> {
        let Node::Folder(folder) = &root else {
            return Err(SnapshotError::RootNotFolder);
        };
        if !folder.id().is_root() {
            return Err(SnapshotError::RootIdMismatch(folder.id().clone()));
        }

        let mut seen = HashSet::new();
        validate(&root, &mut seen)?;

        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &Folder {
        match self.root.as_ref() {
            Node::Folder(folder) => folder,
            _ => unreachable!("tree root is always a folder"),
        }
    }

    pub fn root_node(&self) -> &Node {
        &self.root
    }

    pub fn find_folder(&self, id: &str) -> Result<&Folder, TreeError> {
        self.locate(id, Some(NodeKind::Folder))
            .and_then(|path| self.node_at(&path))
            .and_then(Node::as_folder)
            .ok_or_else(|| TreeError::NotFound(NodeId::from(id)))
    }

    pub fn find_node(&self, id: &str) -> Result<&Node, TreeError> {
        self.locate(id, None)
            .and_then(|path| self.node_at(&path))
            .ok_or_else(|| TreeError::NotFound(NodeId::from(id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.locate(id, None).is_some()
    }

    /// Folder ids from the root down to folder `id`, both ends included.
    pub fn folder_chain(&self, id: &str) -> Option<Vec<NodeId>> {
        let path = self.locate(id, Some(NodeKind::Folder))?;
        let mut chain = vec![self.root.id().clone()];
        let mut current: &Node = &self.root;
        for idx in path {
            current = current.as_folder()?.child_slots().get(idx)?;
            chain.push(current.id().clone());
        }
        Some(chain)
    }

    /// Visits every node in pre-order together with its depth (root = 0).
    pub fn walk(&self, mut visit: impl FnMut(&Node, usize)) {
        walk_node(&self.root, 0, &mut visit);
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.walk(|_, _| count += 1);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.root().is_empty()
    }

    /// Child-index path from the root to the first pre-order node with `id`,
    /// optionally restricted to one kind. The root itself is the empty path.
    pub(crate) fn locate(&self, id: &str, kind: Option<NodeKind>) -> Option<Vec<usize>> {
        let mut trail = Vec::new();
        locate_in(&self.root, id, kind, &mut trail).then_some(trail)
    }

    fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let mut current: &Node = &self.root;
        for &idx in path {
            current = current.as_folder()?.child_slots().get(idx)?;
        }
        Some(current)
    }

    /// Mutable access along `path`, cloning every shared node on the way.
    fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut current: &mut Node = Arc::make_mut(&mut self.root);
        for &idx in path {
            current = match current {
                Node::Folder(folder) => Arc::make_mut(folder.child_slots_mut().get_mut(idx)?),
                _ => return None,
            };
        }
        Some(current)
    }

    fn id_set(&self) -> HashSet<NodeId> {
        let mut ids = HashSet::new();
        self.walk(|node, _| {
            ids.insert(node.id().clone());
        });
        ids
    }
}

fn locate_in(node: &Node, id: &str, kind: Option<NodeKind>, trail: &mut Vec<usize>) -> bool {
    if node.id() == id && kind.is_none_or(|kind| node.kind() == kind) {
        return true;
    }

    let Node::Folder(folder) = node else {
        return false;
    };

    for (idx, child) in folder.child_slots().iter().enumerate() {
        trail.push(idx);
        if locate_in(child, id, kind, trail) {
            return true;
        }
        trail.pop();
    }

    false
}

fn walk_node(node: &Node, depth: usize, visit: &mut impl FnMut(&Node, usize)) {
    visit(node, depth);
    if let Node::Folder(folder) = node {
        for child in folder.children() {
            walk_node(child, depth + 1, visit);
        }
    }
}

fn validate(node: &Node, seen: &mut HashSet<NodeId>) -> Result<(), SnapshotError> {
    if !seen.insert(node.id().clone()) {
        return Err(SnapshotError::DuplicateId(node.id().clone()));
    }
    if node.name().trim().is_empty() {
        return Err(SnapshotError::BlankName(node.id().clone()));
    }

    match node {
        Node::Note(note) if note.updated_at() < note.created_at() => {
            Err(SnapshotError::TimestampOrder(note.id().clone()))
        }
        Node::Folder(folder) => folder.children().try_for_each(|child| validate(child, seen)),
        _ => Ok(()),
    }
}

fn collect_ids(node: &Node, out: &mut Vec<NodeId>) {
    out.push(node.id().clone());
    if let Node::Folder(folder) = node {
        for child in folder.children() {
            collect_ids(child, out);
        }
    }
}

/// Owns the current tree and is the only thing that mutates it.
pub struct TreeEngine {
    tree: Tree,
    ids: Box<dyn IdSource>,
}

impl fmt::Debug for TreeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeEngine")
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}

impl TreeEngine {
    pub fn new(root_name: &str) -> Self {
        Self::from_tree(Tree::new(root_name), Box::new(RandomIds))
    }

    pub fn from_tree(tree: Tree, ids: Box<dyn IdSource>) -> Self {
        Self { tree, ids }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn snapshot(&self) -> Tree {
        self.tree.clone()
    }

    pub fn find_folder(&self, id: &str) -> Result<&Folder, TreeError> {
        self.tree.find_folder(id)
    }

    pub fn find_node(&self, id: &str) -> Result<&Node, TreeError> {
        self.tree.find_node(id)
    }

    /// Appends `node` (and its subtree) as the last child of `parent_id`.
    pub fn add_child(&mut self, parent_id: &str, node: Node) -> Result<(), TreeError> {
        let parent_path = self
            .tree
            .locate(parent_id, Some(NodeKind::Folder))
            .ok_or_else(|| TreeError::ParentNotFound(NodeId::from(parent_id)))?;

        let mut incoming = Vec::new();
        collect_ids(&node, &mut incoming);
        let mut existing = self.tree.id_set();
        for id in incoming {
            if !existing.insert(id.clone()) {
                return Err(TreeError::DuplicateId(id));
            }
        }

        let node_id = node.id().clone();
        let parent = self
            .tree
            .node_at_mut(&parent_path)
            .and_then(Node::as_folder_mut)
            .ok_or_else(|| TreeError::ParentNotFound(NodeId::from(parent_id)))?;
        parent.child_slots_mut().push(Arc::new(node));

        tracing::debug!(parent = parent_id, node = %node_id, "node added");
        Ok(())
    }

    pub fn add_folder(&mut self, parent_id: &str, name: &str) -> Result<NodeId, TreeError> {
        let id = self.fresh_id();
        self.add_child(parent_id, Folder::new(id.clone(), name)?.into())?;
        Ok(id)
    }

    pub fn add_note(&mut self, parent_id: &str, name: &str) -> Result<NodeId, TreeError> {
        let id = self.fresh_id();
        self.add_child(parent_id, Note::new(id.clone(), name)?.into())?;
        Ok(id)
    }

    pub fn add_file(
        &mut self,
        parent_id: &str,
        name: &str,
        payload: Option<PayloadKey>,
        size: u64,
    ) -> Result<NodeId, TreeError> {
        let id = self.fresh_id();
        self.add_child(parent_id, File::new(id.clone(), name, payload, size)?.into())?;
        Ok(id)
    }

    /// Renames any node, root included. Notes get their `updated_at` bumped.
    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<(), TreeError> {
        let name = normalize_name(new_name)?;
        let path = self
            .tree
            .locate(id, None)
            .ok_or_else(|| TreeError::NotFound(NodeId::from(id)))?;
        let node = self
            .tree
            .node_at_mut(&path)
            .ok_or_else(|| TreeError::NotFound(NodeId::from(id)))?;
        node.set_name(name);

        tracing::debug!(node = id, "node renamed");
        Ok(())
    }

    /// Removes the first pre-order match from its parent. The root has no
    /// parent and is never removed.
    pub fn delete(&mut self, id: &str) -> bool {
        self.detach(id).is_some()
    }

    /// Like [`delete`](Self::delete), returning the removed subtree.
    pub fn detach(&mut self, id: &str) -> Option<Arc<Node>> {
        let path = self.tree.locate(id, None)?;
        let (&last, parent_path) = path.split_last()?;
        let parent = self.tree.node_at_mut(parent_path)?.as_folder_mut()?;
        let slots = parent.child_slots_mut();
        if last >= slots.len() {
            return None;
        }
        let removed = slots.remove(last);

        tracing::debug!(node = id, "node deleted");
        Some(removed)
    }

    pub fn edit_note_content(&mut self, id: &str, text: impl Into<String>) -> bool {
        let Some(path) = self.tree.locate(id, Some(NodeKind::Note)) else {
            return false;
        };
        let Some(note) = self.tree.node_at_mut(&path).and_then(Node::as_note_mut) else {
            return false;
        };
        note.set_content(text.into());
        true
    }

    fn fresh_id(&mut self) -> NodeId {
        loop {
            let id = self.ids.next_id();
            if id.as_str() != ROOT_ID && !self.tree.contains(id.as_str()) {
                return id;
            }
            tracing::debug!(%id, "generated id already in use, drawing again");
        }
    }
}
