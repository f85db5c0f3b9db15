//! Persistence slots.
//!
//! The tree, the bookmark list and the theme flag each live in their own
//! slot as JSON. File payload bytes are never written; a reloaded tree keeps
//! its File nodes but their payload handles are gone.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::model::bookmarks::BookmarkIndex;
use crate::model::node::{Node, NodeId};
use crate::model::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Tree,
    Bookmarks,
    Theme,
}

impl Slot {
    pub fn file_name(&self) -> &'static str {
        match self {
            Slot::Tree => "tree.json",
            Slot::Bookmarks => "bookmarks.json",
            Slot::Theme => "theme.json",
        }
    }
}

pub trait SlotStore {
    /// `Ok(None)` when the slot was never written.
    fn read(&self, slot: Slot) -> Result<Option<String>, StorageError>;
    fn write(&mut self, slot: Slot, contents: &str) -> Result<(), StorageError>;
}

/// One JSON file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FsSlotStore {
    dir: PathBuf,
}

impl FsSlotStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.file_name())
    }
}

impl SlotStore for FsSlotStore {
    fn read(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(slot)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes to a sibling temp file and renames it over the slot.
    fn write(&mut self, slot: Slot, contents: &str) -> Result<(), StorageError> {
        let path = self.path(slot);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    slots: HashMap<Slot, String>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }
}

impl SlotStore for MemorySlotStore {
    fn read(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(&slot).cloned())
    }

    fn write(&mut self, slot: Slot, contents: &str) -> Result<(), StorageError> {
        self.slots.insert(slot, contents.to_string());
        Ok(())
    }
}

/// The stored tree, or a fresh root-only tree when the slot is empty.
pub fn load_tree(store: &dyn SlotStore, root_name: &str) -> Result<Tree, StorageError> {
    let Some(raw) = store.read(Slot::Tree)? else {
        tracing::info!("no stored tree, starting with an empty root");
        return Ok(Tree::new(root_name));
    };

    let root: Node = serde_json::from_str(&raw)?;
    let tree = Tree::from_root(root)?;
    tracing::info!(nodes = tree.len(), "tree loaded");
    Ok(tree)
}

pub fn save_tree(store: &mut dyn SlotStore, tree: &Tree) -> Result<(), StorageError> {
    let raw = serde_json::to_string(tree.root_node())?;
    store.write(Slot::Tree, &raw)
}

pub fn load_bookmarks(store: &dyn SlotStore) -> Result<BookmarkIndex, StorageError> {
    let Some(raw) = store.read(Slot::Bookmarks)? else {
        return Ok(BookmarkIndex::new());
    };
    let ids: Vec<NodeId> = serde_json::from_str(&raw)?;
    Ok(BookmarkIndex::from_ids(ids))
}

pub fn save_bookmarks(
    store: &mut dyn SlotStore,
    bookmarks: &BookmarkIndex,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(bookmarks)?;
    store.write(Slot::Bookmarks, &raw)
}

pub fn load_theme(store: &dyn SlotStore, default_dark: bool) -> Result<bool, StorageError> {
    match store.read(Slot::Theme)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(default_dark),
    }
}

pub fn save_theme(store: &mut dyn SlotStore, dark_mode: bool) -> Result<(), StorageError> {
    store.write(Slot::Theme, &serde_json::to_string(&dark_mode)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapshotError;

    #[test]
    fn empty_store_yields_defaults() {
        let store = MemorySlotStore::new();
        let tree = load_tree(&store, "Home").unwrap();
        assert_eq!(tree.root().name(), "Home");
        assert!(tree.is_empty());
        assert!(load_bookmarks(&store).unwrap().is_empty());
        assert!(load_theme(&store, true).unwrap());
    }

    #[test]
    fn theme_is_a_plain_bool() {
        let mut store = MemorySlotStore::new();
        save_theme(&mut store, true).unwrap();
        assert_eq!(store.get(Slot::Theme), Some("true"));
        assert!(load_theme(&store, false).unwrap());
    }

    #[test]
    fn corrupt_slots_are_errors() {
        let mut store = MemorySlotStore::new();
        store.write(Slot::Tree, "{not json").unwrap();
        assert!(matches!(
            load_tree(&store, "Root"),
            Err(StorageError::Json(_))
        ));

        store
            .write(Slot::Tree, r#"{"type":"note","id":"root","name":"x","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#)
            .unwrap();
        assert!(matches!(
            load_tree(&store, "Root"),
            Err(StorageError::Snapshot(SnapshotError::RootNotFolder))
        ));
    }

    #[test]
    fn stored_bookmarks_are_deduplicated() {
        let mut store = MemorySlotStore::new();
        store.write(Slot::Bookmarks, r#"["a","b","a"]"#).unwrap();
        let index = load_bookmarks(&store).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn fs_store_reads_back_written_slots() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsSlotStore::open(dir.path().join("nested")).unwrap();
        assert!(store.read(Slot::Tree).unwrap().is_none());

        store.write(Slot::Tree, "{}").unwrap();
        assert_eq!(store.read(Slot::Tree).unwrap().as_deref(), Some("{}"));
        assert!(store.dir().join("tree.json").exists());
        assert!(!store.dir().join("tree.json.tmp").exists());
    }
}
