//! Plain-text extraction for source documents.
//!
//! Word documents (`.docx`) are unpacked and their paragraphs emitted one per
//! line so that paragraph boundaries survive into chunking. Any other file
//! is read as UTF-8, replacing invalid sequences.

use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

/// Upper bound on the decompressed `word/document.xml`.
const MAX_DOCUMENT_XML_BYTES: u64 = 50 * 1024 * 1024;

/// How a file's bytes are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Docx,
    Text,
}

impl SourceFormat {
    /// Chosen by extension, case-insensitively. Anything but `.docx` is text.
    pub fn for_path(path: &Path) -> Self {
        let is_docx = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
        if is_docx {
            SourceFormat::Docx
        } else {
            SourceFormat::Text
        }
    }
}

/// Extraction error. Ingestion skips the file rather than abort the run.
#[derive(Debug)]
pub enum ExtractError {
    Io(std::io::Error),
    Docx(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "read failed: {}", e),
            ExtractError::Docx(e) => write!(f, "docx extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Io(e)
    }
}

fn docx_err(e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Docx(e.to_string())
}

/// Read a source file and return its text content.
pub fn read_source_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    extract_text(&bytes, SourceFormat::for_path(path))
}

pub fn extract_text(bytes: &[u8], format: SourceFormat) -> Result<String, ExtractError> {
    match format {
        SourceFormat::Docx => docx_text(bytes),
        SourceFormat::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(docx_err)?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| docx_err("word/document.xml missing"))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_DOCUMENT_XML_BYTES)
        .read_to_end(&mut xml)
        .map_err(docx_err)?;
    if xml.len() as u64 >= MAX_DOCUMENT_XML_BYTES {
        return Err(docx_err("word/document.xml too large"));
    }

    Ok(docx_paragraphs(&xml)?.join("\n"))
}

/// Text of each non-blank top-level `w:p`, built from its `w:t` runs. A
/// paragraph nested in a text box is folded into its enclosing paragraph.
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut line = String::new();
    let mut inside_run_text = false;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(docx_err)?;
        match event {
            Event::Start(e) if e.local_name().as_ref() == b"t" => inside_run_text = true,
            Event::Start(e) if e.local_name().as_ref() == b"p" => {
                if depth == 0 {
                    line.clear();
                }
                depth += 1;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"tab" => line.push('\t'),
            Event::Empty(e) if e.local_name().as_ref() == b"br" => line.push(' '),
            Event::Text(t) if inside_run_text => {
                line.push_str(&t.unescape().map_err(docx_err)?);
            }
            Event::End(e) if e.local_name().as_ref() == b"t" => inside_run_text = false,
            Event::End(e) if e.local_name().as_ref() == b"p" && depth > 1 => {
                depth -= 1;
                line.push(' ');
            }
            Event::End(e) if e.local_name().as_ref() == b"p" => {
                depth = 0;
                let text = line.trim();
                if !text.is_empty() {
                    paragraphs.push(text.to_string());
                }
                line.clear();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}
