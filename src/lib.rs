//! A virtual shelf of folders, files and notes.
//!
//! [`model::tree::TreeEngine`] owns the tree, [`session::Session`] ties it to
//! bookmarks, navigation, payload bytes, previews and persistence.

pub mod error;
pub mod import;
pub mod model;
pub mod preview;
pub mod session;
pub mod storage;

pub use error::{DecodeError, PathError, SnapshotError, StorageError, TransferError, TreeError};
pub use model::node::{File, Folder, Node, NodeId, NodeKind, Note, ROOT_ID};
pub use model::tree::{Tree, TreeEngine};
pub use session::{Opened, Session, SessionOptions};
