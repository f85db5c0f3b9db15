//! Copying host files into the tree and payloads back out.
//!
//! Directory walks honour `.gitignore` and friends through `ignore`, but
//! hidden entries are included.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{TransferError, TreeError};
use crate::model::node::{Node, NodeId};
use crate::model::payload::PayloadStore;
use crate::model::tree::TreeEngine;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub folders: usize,
    pub files: usize,
    pub bytes: u64,
    /// Entries that could not be read or named.
    pub skipped: usize,
}

/// Adds `source` under `parent_id`. A directory becomes a folder holding its
/// contents, folders first and then case-insensitive name order.
pub fn import_path(
    engine: &mut TreeEngine,
    payloads: &mut PayloadStore,
    parent_id: &str,
    source: &Path,
) -> Result<ImportSummary, TransferError> {
    let metadata = fs::metadata(source).map_err(|err| io_error(source, err))?;
    let name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| TransferError::Unnamed(source.to_path_buf()))?
        .to_string();

    let mut summary = ImportSummary::default();
    if metadata.is_dir() {
        let folder_id = engine.add_folder(parent_id, &name)?;
        summary.folders += 1;
        import_children(engine, payloads, &folder_id, source, &mut summary)?;
    } else {
        let bytes = fs::read(source).map_err(|err| io_error(source, err))?;
        add_file(engine, payloads, parent_id, &name, bytes, &mut summary)?;
    }

    tracing::info!(
        source = %source.display(),
        folders = summary.folders,
        files = summary.files,
        skipped = summary.skipped,
        "import finished"
    );
    Ok(summary)
}

/// Writes the payload of file `id` to `dest`, returning the byte count.
pub fn export_payload(
    engine: &TreeEngine,
    payloads: &PayloadStore,
    id: &str,
    dest: &Path,
) -> Result<u64, TransferError> {
    let node = engine.find_node(id)?;
    let Node::File(file) = node else {
        return Err(TransferError::NotAFile(NodeId::from(id)));
    };
    let bytes = file
        .payload()
        .and_then(|key| payloads.get(key))
        .ok_or_else(|| TransferError::PayloadUnavailable(NodeId::from(id)))?;

    fs::write(dest, &bytes).map_err(|err| io_error(dest, err))?;
    tracing::info!(node = id, dest = %dest.display(), "payload exported");
    Ok(bytes.len() as u64)
}

fn import_children(
    engine: &mut TreeEngine,
    payloads: &mut PayloadStore,
    parent_id: &NodeId,
    dir: &Path,
    summary: &mut ImportSummary,
) -> Result<(), TransferError> {
    let mut entries: Vec<(PathBuf, bool, String)> = Vec::new();
    for entry in WalkBuilder::new(dir).max_depth(Some(1)).hidden(false).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), "skipping unreadable entry: {err}");
                summary.skipped += 1;
                continue;
            }
        };
        let path = entry.path().to_path_buf();
        if path == dir {
            continue;
        }

        let (Ok(metadata), Some(name)) = (entry.metadata(), entry.file_name().to_str()) else {
            tracing::warn!(path = %path.display(), "skipping entry without metadata or utf-8 name");
            summary.skipped += 1;
            continue;
        };
        entries.push((path, metadata.is_dir(), name.to_string()));
    }

    entries.sort_by(|a, b| match (a.1, b.1) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.2.to_lowercase().cmp(&b.2.to_lowercase()),
    });

    for (path, is_dir, name) in entries {
        if is_dir {
            let folder_id = match engine.add_folder(parent_id.as_str(), &name) {
                Ok(id) => id,
                Err(TreeError::InvalidName) => {
                    summary.skipped += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            summary.folders += 1;
            import_children(engine, payloads, &folder_id, &path, summary)?;
            continue;
        }

        match fs::read(&path) {
            Ok(bytes) => add_file(engine, payloads, parent_id.as_str(), &name, bytes, summary)?,
            Err(err) => {
                tracing::warn!(path = %path.display(), "skipping unreadable file: {err}");
                summary.skipped += 1;
            }
        }
    }

    Ok(())
}

fn add_file(
    engine: &mut TreeEngine,
    payloads: &mut PayloadStore,
    parent_id: &str,
    name: &str,
    bytes: Vec<u8>,
    summary: &mut ImportSummary,
) -> Result<(), TransferError> {
    let size = bytes.len() as u64;
    let key = payloads.insert(bytes);
    match engine.add_file(parent_id, name, Some(key), size) {
        Ok(_) => {
            summary.files += 1;
            summary.bytes += size;
            Ok(())
        }
        Err(TreeError::InvalidName) => {
            payloads.release(key);
            summary.skipped += 1;
            Ok(())
        }
        Err(err) => {
            payloads.release(key);
            Err(err.into())
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> TransferError {
    TransferError::Io {
        path: path.to_path_buf(),
        source,
    }
}
