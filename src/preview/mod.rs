//! Preview classification and decoding.
//!
//! The engine never looks inside payloads. This module decides how a file is
//! shown and turns payload bytes into something displayable.

pub mod docx;
pub mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::DecodeError;
use crate::model::node::{File, NodeId, PreviewHandle};
use crate::model::note_editor::NoteDraft;

use self::docx::DocxDocument;

/// Extensions shown as plain text.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "js", "json", "css", "html", "md", "csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// Display handle assigned when the file was added.
    Image,
    Text,
    Docx,
    /// Embedded as-is; no decoding.
    Pdf,
    /// Only an export is offered.
    Unsupported,
}

impl PreviewKind {
    pub fn needs_decode(&self) -> bool {
        matches!(self, PreviewKind::Text | PreviewKind::Docx)
    }
}

pub fn classify(file: &File) -> PreviewKind {
    if file.preview().is_some() {
        return PreviewKind::Image;
    }

    match file.extension().as_deref() {
        Some("docx") => PreviewKind::Docx,
        Some("pdf") => PreviewKind::Pdf,
        Some(ext) if TEXT_EXTENSIONS.contains(&ext) => PreviewKind::Text,
        _ => PreviewKind::Unsupported,
    }
}

/// Identifies one preview request. Outcomes carrying an older ticket are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreviewTicket(pub u64);

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Text { text: String, truncated: bool },
    Document(DocxDocument),
}

/// Everything a worker needs; owns its bytes so the tree can keep changing.
#[derive(Debug, Clone)]
pub struct DecodeJob {
    pub ticket: PreviewTicket,
    pub node_id: NodeId,
    pub kind: PreviewKind,
    pub payload: Arc<[u8]>,
    pub max_text_bytes: usize,
    pub cancel: CancelFlag,
}

#[derive(Debug)]
pub struct DecodeOutcome {
    pub ticket: PreviewTicket,
    pub node_id: NodeId,
    pub result: Result<Decoded, DecodeError>,
}

/// What the preview pane currently shows.
#[derive(Debug, Clone)]
pub enum PreviewBody {
    Loading,
    Image(PreviewHandle),
    Text {
        text: String,
        truncated: bool,
        extension: String,
    },
    Document(DocxDocument),
    Pdf {
        size: u64,
    },
    Unsupported,
    /// Decode failed or bytes are gone; holds the message shown instead.
    Failed(String),
    Note(NoteDraft),
}

impl PreviewBody {
    /// Whether the pane offers exporting the raw payload.
    pub fn offers_export(&self) -> bool {
        matches!(
            self,
            PreviewBody::Pdf { .. } | PreviewBody::Unsupported | PreviewBody::Image(_)
        )
    }
}

pub fn decode(kind: PreviewKind, bytes: &[u8], max_text_bytes: usize) -> Result<Decoded, DecodeError> {
    match kind {
        PreviewKind::Text => Ok(decode_text(bytes, max_text_bytes)),
        PreviewKind::Docx => docx::convert(bytes).map(Decoded::Document),
        PreviewKind::Image | PreviewKind::Pdf | PreviewKind::Unsupported => {
            Err(DecodeError::NotDecodable)
        }
    }
}

fn decode_text(bytes: &[u8], max_bytes: usize) -> Decoded {
    let truncated = bytes.len() > max_bytes;
    let slice = if truncated { &bytes[..max_bytes] } else { bytes };
    let mut text = String::from_utf8_lossy(slice).into_owned();
    if truncated && text.ends_with(char::REPLACEMENT_CHARACTER) {
        // cut in the middle of a multi-byte char
        text.pop();
    }
    Decoded::Text { text, truncated }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> File {
        File::new("f", name, None, 0).unwrap()
    }

    #[test]
    fn classification_follows_extension() {
        assert_eq!(classify(&file("cat.PNG")), PreviewKind::Image);
        assert_eq!(classify(&file("notes.md")), PreviewKind::Text);
        assert_eq!(classify(&file("data.CSV")), PreviewKind::Text);
        assert_eq!(classify(&file("report.docx")), PreviewKind::Docx);
        assert_eq!(classify(&file("paper.pdf")), PreviewKind::Pdf);
        assert_eq!(classify(&file("legacy.doc")), PreviewKind::Unsupported);
        assert_eq!(classify(&file("archive.tar.gz")), PreviewKind::Unsupported);
        assert_eq!(classify(&file("Makefile")), PreviewKind::Unsupported);
    }

    #[test]
    fn text_decode_is_lossy_and_capped() {
        let decoded = decode(PreviewKind::Text, "héllo".as_bytes(), 2).unwrap();
        assert_eq!(
            decoded,
            Decoded::Text {
                text: "h".to_string(),
                truncated: true
            }
        );

        let decoded = decode(PreviewKind::Text, b"ok\xff", 100).unwrap();
        assert_eq!(
            decoded,
            Decoded::Text {
                text: "ok\u{FFFD}".to_string(),
                truncated: false
            }
        );
    }

    #[test]
    fn only_text_and_docx_decode_off_thread() {
        assert!(PreviewKind::Text.needs_decode());
        assert!(PreviewKind::Docx.needs_decode());
        assert!(!PreviewKind::Image.needs_decode());
        assert!(!PreviewKind::Pdf.needs_decode());
        assert!(!PreviewKind::Unsupported.needs_decode());
    }

    #[test]
    fn non_decodable_kinds_are_rejected() {
        assert!(matches!(
            decode(PreviewKind::Pdf, b"%PDF", 10),
            Err(DecodeError::NotDecodable)
        ));
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::default();
        let seen_by_worker = flag.clone();
        flag.cancel();
        assert!(seen_by_worker.is_cancelled());
    }
}
