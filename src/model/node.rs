use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::model::payload::PayloadKey;

/// Reserved id of the single root folder.
pub const ROOT_ID: &str = "root";

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Folder,
    File,
    Note,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::File => "file",
            NodeKind::Note => "note",
        }
    }
}

/// One entry of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Folder(Folder),
    File(File),
    Note(Note),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Folder(folder) => &folder.id,
            Node::File(file) => &file.id,
            Node::Note(note) => &note.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Folder(folder) => &folder.name,
            Node::File(file) => &file.name,
            Node::Note(note) => &note.name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Folder(_) => NodeKind::Folder,
            Node::File(_) => NodeKind::File,
            Node::Note(_) => NodeKind::Note,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Node::Folder(folder) => Some(folder),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Node::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Node::Note(note) => Some(note),
            _ => None,
        }
    }

    pub(crate) fn as_folder_mut(&mut self) -> Option<&mut Folder> {
        match self {
            Node::Folder(folder) => Some(folder),
            _ => None,
        }
    }

    pub(crate) fn as_note_mut(&mut self) -> Option<&mut Note> {
        match self {
            Node::Note(note) => Some(note),
            _ => None,
        }
    }

    /// Caller has already normalized `name`.
    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            Node::Folder(folder) => folder.name = name,
            Node::File(file) => file.name = name,
            Node::Note(note) => {
                note.name = name;
                note.touch();
            }
        }
    }
}

impl From<Folder> for Node {
    fn from(value: Folder) -> Self {
        Node::Folder(value)
    }
}

impl From<File> for Node {
    fn from(value: File) -> Self {
        Node::File(value)
    }
}

impl From<Note> for Node {
    fn from(value: Note) -> Self {
        Node::Note(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    id: NodeId,
    name: String,
    #[serde(default)]
    children: Vec<Arc<Node>>,
}

impl Folder {
    pub fn new(id: impl Into<NodeId>, name: &str) -> Result<Self, TreeError> {
        Ok(Self {
            id: id.into(),
            name: normalize_name(name)?,
            children: Vec::new(),
        })
    }

    /// The root folder. A blank name falls back to "Root".
    pub fn root(name: &str) -> Self {
        Self {
            id: NodeId::root(),
            name: normalize_name(name).unwrap_or_else(|_| "Root".to_string()),
            children: Vec::new(),
        }
    }

    /// Appends a child while building a detached subtree.
    pub fn with_child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(Arc::new(node.into()));
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = &Node> {
        self.children.iter().map(|child| child.as_ref())
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn child_slots(&self) -> &[Arc<Node>] {
        &self.children
    }

    pub(crate) fn child_slots_mut(&mut self) -> &mut Vec<Arc<Node>> {
        &mut self.children
    }
}

/// Display handle derived from a file name when the file is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewHandle {
    pub media_type: String,
}

impl PreviewHandle {
    pub fn for_name(name: &str) -> Option<Self> {
        let ext = extension_of(name)?;
        IMAGE_TYPES
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, media_type)| Self {
                media_type: media_type.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    id: NodeId,
    name: String,
    #[serde(skip)]
    payload: Option<PayloadKey>,
    #[serde(default)]
    preview: Option<PreviewHandle>,
    #[serde(default)]
    size: u64,
}

impl File {
    pub fn new(
        id: impl Into<NodeId>,
        name: &str,
        payload: Option<PayloadKey>,
        size: u64,
    ) -> Result<Self, TreeError> {
        let name = normalize_name(name)?;
        let preview = PreviewHandle::for_name(&name);
        Ok(Self {
            id: id.into(),
            name,
            payload,
            preview,
            size,
        })
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` once the tree has been reloaded from storage.
    pub fn payload(&self) -> Option<PayloadKey> {
        self.payload
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lowercased extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    id: NodeId,
    name: String,
    #[serde(default)]
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(id: impl Into<NodeId>, name: &str) -> Result<Self, TreeError> {
        let now = Utc::now();
        Ok(Self {
            id: id.into(),
            name: normalize_name(name)?,
            content: String::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Initial content for a note that is not yet in a tree.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn set_content(&mut self, content: String) {
        self.content = content;
        self.touch();
    }

    /// Moves `updated_at` strictly forward, even when the clock has not.
    pub(crate) fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::nanoseconds(1)
        };
    }
}

pub(crate) fn normalize_name(name: &str) -> Result<String, TreeError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TreeError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
