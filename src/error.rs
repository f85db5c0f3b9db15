use thiserror::Error;

use crate::model::node::NodeId;

/// Failures of tree engine operations. A failed operation leaves the tree untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NotFound(NodeId),
    #[error("parent folder not found: {0}")]
    ParentNotFound(NodeId),
    #[error("name must not be blank")]
    InvalidName,
    #[error("id already present in tree: {0}")]
    DuplicateId(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("breadcrumb index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Why a loaded tree was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("root node must be a folder")]
    RootNotFolder,
    #[error("root folder must have id `root`, found `{0}`")]
    RootIdMismatch(NodeId),
    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),
    #[error("node {0} has a blank name")]
    BlankName(NodeId),
    #[error("note {0} was updated before it was created")]
    TimestampOrder(NodeId),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not available in this session")]
    PayloadUnavailable,
    #[error("cannot read archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("malformed document xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("document part missing: {0}")]
    MissingPart(&'static str),
    #[error("document part {part} is too large ({size} bytes)")]
    TooLarge { part: &'static str, size: u64 },
    #[error("nothing to decode for this kind of file")]
    NotDecodable,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored tree rejected: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Moving bytes between the host filesystem and the tree.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("{} has no usable file name", .0.display())]
    Unnamed(std::path::PathBuf),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("{0} is not a file")]
    NotAFile(NodeId),
    #[error("payload of {0} is not available in this session")]
    PayloadUnavailable(NodeId),
}
