//! The session: one owner for everything a user can change.
//!
//! Every mutation goes through here so the side effects stay together. A
//! delete closes a preview bound to the removed subtree, drops the bookmark,
//! releases payloads and trims the breadcrumb before anything is persisted.

use std::path::Path;

use crate::error::{DecodeError, PathError, StorageError, TransferError, TreeError};
use crate::import::{self, ImportSummary};
use crate::model::bookmarks::BookmarkIndex;
use crate::model::config::AppConfig;
use crate::model::id::{IdSource, RandomIds};
use crate::model::node::{Node, NodeId, NodeKind};
use crate::model::note_editor::NoteDraft;
use crate::model::path::Breadcrumb;
use crate::model::payload::PayloadStore;
use crate::model::tree::{Tree, TreeEngine};
use crate::model::view::{self, ViewMode};
use crate::preview::{
    CancelFlag, DecodeJob, DecodeOutcome, Decoded, PreviewBody, PreviewKind, PreviewTicket,
    classify,
};
use crate::storage::{self, SlotStore};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub root_name: String,
    pub dark_mode_default: bool,
    pub max_text_bytes: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            root_name: "Root".to_string(),
            dark_mode_default: false,
            max_text_bytes: 256 * 1024,
        }
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            root_name: config.general.root_name.clone(),
            dark_mode_default: config.general.dark_mode_default,
            max_text_bytes: config.preview.max_text_bytes,
        }
    }
}

/// The item open in the preview pane.
#[derive(Debug)]
pub struct ActivePreview {
    pub node_id: NodeId,
    pub ticket: PreviewTicket,
    pub body: PreviewBody,
    cancel: CancelFlag,
}

/// Result of opening a list item.
#[derive(Debug)]
pub enum Opened {
    Folder,
    /// Preview body is ready.
    Preview,
    /// Preview shows `Loading` until this job's outcome is applied.
    Decode(DecodeJob),
}

pub struct Session {
    engine: TreeEngine,
    path: Breadcrumb,
    bookmarks: BookmarkIndex,
    payloads: PayloadStore,
    view: ViewMode,
    search: String,
    preview: Option<ActivePreview>,
    dark_mode: bool,
    store: Box<dyn SlotStore>,
    next_ticket: u64,
    max_text_bytes: usize,
    storage_warning: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("engine", &self.engine)
            .field("path", &self.path)
            .field("view", &self.view)
            .field("dark_mode", &self.dark_mode)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Restores tree, bookmarks and theme from `store`, with random ids.
    pub fn load(store: Box<dyn SlotStore>, options: SessionOptions) -> Result<Self, StorageError> {
        Self::load_with_ids(store, Box::new(RandomIds), options)
    }

    pub fn load_with_ids(
        store: Box<dyn SlotStore>,
        ids: Box<dyn IdSource>,
        options: SessionOptions,
    ) -> Result<Self, StorageError> {
        let tree = storage::load_tree(store.as_ref(), &options.root_name)?;
        let bookmarks = storage::load_bookmarks(store.as_ref())?;
        let dark_mode = storage::load_theme(store.as_ref(), options.dark_mode_default)?;

        Ok(Self {
            engine: TreeEngine::from_tree(tree, ids),
            path: Breadcrumb::new(),
            bookmarks,
            payloads: PayloadStore::new(),
            view: ViewMode::Folder,
            search: String::new(),
            preview: None,
            dark_mode,
            store,
            next_ticket: 0,
            max_text_bytes: options.max_text_bytes,
            storage_warning: None,
        })
    }

    pub fn tree(&self) -> &Tree {
        self.engine.tree()
    }

    pub fn breadcrumb(&self) -> &Breadcrumb {
        &self.path
    }

    pub fn bookmarks(&self) -> &BookmarkIndex {
        &self.bookmarks
    }

    pub fn payloads(&self) -> &PayloadStore {
        &self.payloads
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn preview(&self) -> Option<&ActivePreview> {
        self.preview.as_ref()
    }

    pub fn current_folder_id(&self) -> &NodeId {
        self.path.current()
    }

    /// Last persistence failure, cleared on read.
    pub fn take_storage_warning(&mut self) -> Option<String> {
        self.storage_warning.take()
    }

    /// The list for the current view mode, folder and search term.
    pub fn visible_items(&self) -> Vec<&Node> {
        view::compose(
            self.view,
            self.engine.tree(),
            self.path.current().as_str(),
            &self.bookmarks,
            &self.search,
        )
    }

    pub fn breadcrumb_labels(&self) -> Vec<(&NodeId, &str)> {
        view::breadcrumb_labels(self.engine.tree(), &self.path)
    }

    /// Makes folder `id` current. A direct child is pushed onto the
    /// breadcrumb; anything else (a bookmark, say) rebuilds it from the root.
    pub fn enter_folder(&mut self, id: &str) -> Result<(), TreeError> {
        let current = self.engine.find_folder(self.path.current().as_str())?;
        let is_child = current
            .children()
            .any(|child| child.kind() == NodeKind::Folder && child.id() == id);

        if is_child {
            self.path.enter(NodeId::from(id));
        } else {
            let chain = self
                .engine
                .tree()
                .folder_chain(id)
                .ok_or_else(|| TreeError::NotFound(NodeId::from(id)))?;
            if let Some(path) = Breadcrumb::from_chain(chain) {
                self.path = path;
            }
        }

        self.view = ViewMode::Folder;
        Ok(())
    }

    pub fn go_back(&mut self, index: usize) -> Result<(), PathError> {
        self.path.back_to(index)?;
        self.view = ViewMode::Folder;
        Ok(())
    }

    /// Switches between folder and bookmark views. Entering the bookmark
    /// view resets the breadcrumb to the root.
    pub fn toggle_bookmark_view(&mut self) -> ViewMode {
        self.view = match self.view {
            ViewMode::Folder => {
                self.path.reset();
                ViewMode::Bookmarks
            }
            ViewMode::Bookmarks => ViewMode::Folder,
        };
        self.view
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn add_folder(&mut self, name: &str) -> Result<NodeId, TreeError> {
        let parent = self.path.current().clone();
        let id = self.engine.add_folder(parent.as_str(), name)?;
        self.persist_tree();
        Ok(id)
    }

    pub fn add_note(&mut self, name: &str) -> Result<NodeId, TreeError> {
        let parent = self.path.current().clone();
        let id = self.engine.add_note(parent.as_str(), name)?;
        self.persist_tree();
        Ok(id)
    }

    /// Adds a file holding `bytes` to the current folder.
    pub fn add_file(&mut self, name: &str, bytes: Vec<u8>) -> Result<NodeId, TreeError> {
        let parent = self.path.current().clone();
        let size = bytes.len() as u64;
        let key = self.payloads.insert(bytes);
        match self.engine.add_file(parent.as_str(), name, Some(key), size) {
            Ok(id) => {
                self.persist_tree();
                Ok(id)
            }
            Err(err) => {
                self.payloads.release(key);
                Err(err)
            }
        }
    }

    /// Copies a host file or directory into the current folder.
    pub fn import(&mut self, source: &Path) -> Result<ImportSummary, TransferError> {
        let parent = self.path.current().clone();
        let result = import::import_path(
            &mut self.engine,
            &mut self.payloads,
            parent.as_str(),
            source,
        );
        // a failed directory import may still have added entries
        self.persist_tree();
        result
    }

    pub fn export(&self, id: &str, dest: &Path) -> Result<u64, TransferError> {
        import::export_payload(&self.engine, &self.payloads, id, dest)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<(), TreeError> {
        self.engine.rename(id, name)?;
        self.persist_tree();
        Ok(())
    }

    /// Removes `id` with its subtree. Returns false for the root or an
    /// unknown id, leaving everything untouched.
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(removed) = self.engine.detach(id) else {
            return false;
        };

        let mut removed_ids = Vec::new();
        release_subtree(&removed, &mut self.payloads, &mut removed_ids);

        if self
            .preview
            .as_ref()
            .is_some_and(|preview| removed_ids.contains(&preview.node_id))
        {
            self.discard_preview();
        }

        let unbookmarked = self.bookmarks.remove(id);
        self.path.retain_resolvable(self.engine.tree());

        tracing::info!(node = id, removed = removed_ids.len(), "subtree deleted");
        self.persist_tree();
        if unbookmarked {
            self.persist_bookmarks();
        }
        true
    }

    /// Flips the bookmark on `id`. Returns whether it is now bookmarked.
    pub fn toggle_bookmark(&mut self, id: &str) -> Result<bool, TreeError> {
        let node_id = self.engine.find_node(id)?.id().clone();
        let added = self.bookmarks.toggle(&node_id);
        self.persist_bookmarks();
        Ok(added)
    }

    pub fn is_bookmarked(&self, id: &str) -> bool {
        self.bookmarks.contains(id)
    }

    pub fn toggle_theme(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        if let Err(err) = storage::save_theme(self.store.as_mut(), self.dark_mode) {
            self.warn_storage("theme", err);
        }
        self.dark_mode
    }

    /// Opens a list item. Folders are entered; notes and files replace the
    /// current preview, whose note draft is saved first.
    pub fn open(&mut self, id: &str) -> Result<Opened, TreeError> {
        // The replacement draft must start from the saved text.
        self.save_note();

        let (body, decode) = match self.engine.find_node(id)? {
            Node::Folder(_) => {
                self.enter_folder(id)?;
                return Ok(Opened::Folder);
            }
            Node::Note(note) => (PreviewBody::Note(NoteDraft::from_text(note.content())), None),
            Node::File(file) => {
                let kind = classify(file);
                if !kind.needs_decode() {
                    let body = match kind {
                        PreviewKind::Image => match file.preview() {
                            Some(handle) => PreviewBody::Image(handle.clone()),
                            None => PreviewBody::Unsupported,
                        },
                        PreviewKind::Pdf => PreviewBody::Pdf { size: file.size() },
                        _ => PreviewBody::Unsupported,
                    };
                    (body, None)
                } else {
                    match file.payload().and_then(|key| self.payloads.get(key)) {
                        Some(payload) => (PreviewBody::Loading, Some((kind, payload))),
                        None => (
                            PreviewBody::Failed(DecodeError::PayloadUnavailable.to_string()),
                            None,
                        ),
                    }
                }
            }
        };

        self.close_preview();
        let ticket = self.issue_ticket();
        let cancel = CancelFlag::default();
        let node_id = NodeId::from(id);
        tracing::debug!(node = id, ticket = ticket.0, "preview opened");

        let job = decode.map(|(kind, payload)| DecodeJob {
            ticket,
            node_id: node_id.clone(),
            kind,
            payload,
            max_text_bytes: self.max_text_bytes,
            cancel: cancel.clone(),
        });
        self.preview = Some(ActivePreview {
            node_id,
            ticket,
            body,
            cancel,
        });

        Ok(match job {
            Some(job) => Opened::Decode(job),
            None => Opened::Preview,
        })
    }

    /// Installs a worker's outcome. Outcomes for a closed or replaced
    /// preview are dropped; returns whether this one was applied.
    pub fn apply_decoded(&mut self, outcome: DecodeOutcome) -> bool {
        let extension = self.extension_of(&outcome.node_id);
        let Some(preview) = self.preview.as_mut() else {
            return false;
        };
        if preview.ticket != outcome.ticket || preview.node_id != outcome.node_id {
            tracing::debug!(ticket = outcome.ticket.0, "stale preview outcome dropped");
            return false;
        }

        preview.body = match outcome.result {
            Ok(Decoded::Text { text, truncated }) => PreviewBody::Text {
                text,
                truncated,
                extension,
            },
            Ok(Decoded::Document(document)) => PreviewBody::Document(document),
            Err(err) => PreviewBody::Failed(err.to_string()),
        };
        true
    }

    pub fn note_draft_mut(&mut self) -> Option<&mut NoteDraft> {
        match self.preview.as_mut()?.body {
            PreviewBody::Note(ref mut draft) => Some(draft),
            _ => None,
        }
    }

    /// Writes the open note draft back to the tree if it changed.
    pub fn save_note(&mut self) -> bool {
        let Some(preview) = self.preview.as_ref() else {
            return false;
        };
        let PreviewBody::Note(draft) = &preview.body else {
            return false;
        };

        let saved = self
            .engine
            .find_node(preview.node_id.as_str())
            .ok()
            .and_then(Node::as_note)
            .map(|note| note.content().to_string());
        let Some(saved) = saved else {
            return false;
        };
        if !draft.differs_from(&saved) {
            return false;
        }

        let text = draft.text();
        let node_id = preview.node_id.clone();
        if !self.engine.edit_note_content(node_id.as_str(), text) {
            return false;
        }
        tracing::debug!(node = %node_id, "note saved");
        self.persist_tree();
        true
    }

    /// Closes the preview, saving a changed note draft and cancelling any
    /// decode still running for it.
    pub fn close_preview(&mut self) {
        self.save_note();
        self.discard_preview();
    }

    fn discard_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.cancel.cancel();
        }
    }

    fn issue_ticket(&mut self) -> PreviewTicket {
        self.next_ticket += 1;
        PreviewTicket(self.next_ticket)
    }

    fn extension_of(&self, id: &NodeId) -> String {
        self.engine
            .find_node(id.as_str())
            .ok()
            .and_then(Node::as_file)
            .and_then(|file| file.extension())
            .unwrap_or_default()
    }

    fn persist_tree(&mut self) {
        if let Err(err) = storage::save_tree(self.store.as_mut(), self.engine.tree()) {
            self.warn_storage("tree", err);
        }
    }

    fn persist_bookmarks(&mut self) {
        if let Err(err) = storage::save_bookmarks(self.store.as_mut(), &self.bookmarks) {
            self.warn_storage("bookmarks", err);
        }
    }

    fn warn_storage(&mut self, slot: &str, err: StorageError) {
        tracing::error!(slot, "failed to persist: {err}");
        self.storage_warning = Some(format!("could not save {slot}: {err}"));
    }
}

fn release_subtree(node: &Node, payloads: &mut PayloadStore, ids: &mut Vec<NodeId>) {
    ids.push(node.id().clone());
    match node {
        Node::File(file) => {
            if let Some(key) = file.payload() {
                payloads.release(key);
            }
        }
        Node::Folder(folder) => {
            for child in folder.children() {
                release_subtree(child, payloads, ids);
            }
        }
        Node::Note(_) => {}
    }
}
