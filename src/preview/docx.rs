//! Minimal `.docx` to HTML conversion.
//!
//! Reads `word/document.xml` out of the archive and keeps paragraphs,
//! headings, list items and bold/italic/underline runs. Images, tables and
//! styles beyond that are dropped.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::DecodeError;

const DOCUMENT_PART: &str = "word/document.xml";
const MAX_DOCUMENT_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    Paragraph,
    /// Level 1-6.
    Heading(u8),
    ListItem,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub style: BlockStyle,
    pub runs: Vec<Run>,
}

impl Block {
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxDocument {
    pub blocks: Vec<Block>,
}

impl DocxDocument {
    /// HTML fragment: `<p>`, `<h1>`..`<h6>` and `<ul><li>` with inline
    /// `<strong>`, `<em>` and `<u>`.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let mut in_list = false;

        for block in &self.blocks {
            let is_item = block.style == BlockStyle::ListItem;
            if is_item && !in_list {
                html.push_str("<ul>");
            } else if !is_item && in_list {
                html.push_str("</ul>");
            }
            in_list = is_item;

            let tag = match block.style {
                BlockStyle::Paragraph => "p".to_string(),
                BlockStyle::Heading(level) => format!("h{}", level.clamp(1, 6)),
                BlockStyle::ListItem => "li".to_string(),
            };
            html.push_str(&format!("<{tag}>"));
            for run in &block.runs {
                push_run_html(&mut html, run);
            }
            html.push_str(&format!("</{tag}>"));
        }

        if in_list {
            html.push_str("</ul>");
        }
        html
    }
}

pub fn convert(bytes: &[u8]) -> Result<DocxDocument, DecodeError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut part = match archive.by_name(DOCUMENT_PART) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DecodeError::MissingPart(DOCUMENT_PART));
        }
        Err(err) => return Err(err.into()),
    };

    if part.size() > MAX_DOCUMENT_BYTES {
        return Err(DecodeError::TooLarge {
            part: DOCUMENT_PART,
            size: part.size(),
        });
    }

    let xml = read_bounded(&mut part, MAX_DOCUMENT_BYTES)?;
    parse_document_xml(&xml)
}

/// Reads at most `limit` bytes; the size declared in the archive header is not trusted.
fn read_bounded(reader: impl Read, limit: u64) -> Result<String, DecodeError> {
    let mut bytes = Vec::new();
    reader.take(limit + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(DecodeError::TooLarge {
            part: DOCUMENT_PART,
            size: bytes.len() as u64,
        });
    }
    String::from_utf8(bytes)
        .map_err(|err| DecodeError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))
}

fn parse_document_xml(xml: &str) -> Result<DocxDocument, DecodeError> {
    let mut reader = Reader::from_str(xml);
    let mut doc = DocxDocument::default();

    let mut block: Option<Block> = None;
    let mut run: Option<Run> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    block = Some(Block {
                        style: BlockStyle::Paragraph,
                        runs: Vec::new(),
                    });
                }
                b"r" => run = Some(Run::default()),
                b"t" => in_text = true,
                _ => apply_property(&e, block.as_mut(), run.as_mut())?,
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => push_text(run.as_mut(), "\t"),
                b"br" | b"cr" => push_text(run.as_mut(), "\n"),
                _ => apply_property(&e, block.as_mut(), run.as_mut())?,
            },
            Event::Text(text) if in_text => {
                push_text(run.as_mut(), &text.unescape()?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => {
                    if let (Some(finished), Some(block)) = (run.take(), block.as_mut())
                        && !finished.text.is_empty()
                    {
                        block.runs.push(finished);
                    }
                }
                b"p" => {
                    if let Some(finished) = block.take() {
                        doc.blocks.push(finished);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(doc)
}

fn apply_property(
    e: &BytesStart<'_>,
    block: Option<&mut Block>,
    run: Option<&mut Run>,
) -> Result<(), DecodeError> {
    match e.local_name().as_ref() {
        b"b" | b"i" | b"u" => {
            let Some(run) = run else {
                return Ok(());
            };
            let on = toggle_value(e)?;
            match e.local_name().as_ref() {
                b"b" => run.bold = on,
                b"i" => run.italic = on,
                _ => run.underline = on,
            }
        }
        b"pStyle" => {
            if let (Some(block), Some(style)) = (block, attribute(e, "w:val")?) {
                block.style = style_from_name(&style).unwrap_or(block.style);
            }
        }
        b"numPr" => {
            if let Some(block) = block
                && block.style == BlockStyle::Paragraph
            {
                block.style = BlockStyle::ListItem;
            }
        }
        _ => {}
    }
    Ok(())
}

/// `<w:b/>` is on; `<w:b w:val="0"/>`, `"false"` and `"none"` are off.
fn toggle_value(e: &BytesStart<'_>) -> Result<bool, DecodeError> {
    Ok(match attribute(e, "w:val")? {
        Some(value) => !matches!(value.as_str(), "0" | "false" | "none"),
        None => true,
    })
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, DecodeError> {
    match e.try_get_attribute(name).map_err(quick_xml::Error::from)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn style_from_name(style: &str) -> Option<BlockStyle> {
    let lower = style.to_ascii_lowercase();
    if lower == "title" {
        return Some(BlockStyle::Heading(1));
    }
    if lower.starts_with("listparagraph") || lower.starts_with("listbullet") {
        return Some(BlockStyle::ListItem);
    }
    let level = lower.strip_prefix("heading")?.trim().parse::<u8>().ok()?;
    Some(BlockStyle::Heading(level.clamp(1, 6)))
}

fn push_text(run: Option<&mut Run>, text: &str) {
    if let Some(run) = run {
        run.text.push_str(text);
    }
}

fn push_run_html(html: &mut String, run: &Run) {
    let mut open = Vec::new();
    if run.bold {
        open.push("strong");
    }
    if run.italic {
        open.push("em");
    }
    if run.underline {
        open.push("u");
    }

    for tag in &open {
        html.push_str(&format!("<{tag}>"));
    }
    for ch in run.text.chars() {
        match ch {
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            '&' => html.push_str("&amp;"),
            '"' => html.push_str("&quot;"),
            '\n' => html.push_str("<br/>"),
            other => html.push(other),
        }
    }
    for tag in open.iter().rev() {
        html.push_str(&format!("</{tag}>"));
    }
}
