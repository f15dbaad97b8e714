use crate::error::ExtractError;
use lopdf::Document;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Upper bound on the decompressed size of `word/document.xml`.
const MAX_DOCX_XML_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY_ENTRY: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Pdf,
    Docx,
    Unsupported,
}

impl FileKind {
    /// Resolves the kind from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => Self::Pdf,
            Some(ext) if ext.eq_ignore_ascii_case("docx") => Self::Docx,
            _ => Self::Unsupported,
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Unsupported => "unsupported",
        }
    }
}

pub trait TextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let document =
            Document::load(path).map_err(|error| ExtractError::read(FileKind::Pdf, error))?;

        // get_pages is a BTreeMap keyed by page number, so iteration is in page order.
        let mut text = String::new();
        for page_no in document.get_pages().into_keys() {
            let page_text = document
                .extract_text(&[page_no])
                .map_err(|error| ExtractError::read(FileKind::Pdf, error))?;

            if !text.is_empty() && !text.ends_with(char::is_whitespace) {
                text.push('\n');
            }
            text.push_str(&page_text);
        }

        if text.trim().is_empty() {
            return Err(ExtractError::NoExtractableText {
                path: path.to_path_buf(),
            });
        }

        Ok(text)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxTextExtractor;

impl TextExtractor for DocxTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let file = File::open(path).map_err(|error| ExtractError::read(FileKind::Docx, error))?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|error| ExtractError::read(FileKind::Docx, error))?;

        let entry = archive
            .by_name(DOCX_BODY_ENTRY)
            .map_err(|error| ExtractError::read(FileKind::Docx, format!("{DOCX_BODY_ENTRY}: {error}")))?;

        let mut xml = Vec::new();
        entry
            .take(MAX_DOCX_XML_BYTES)
            .read_to_end(&mut xml)
            .map_err(|error| ExtractError::read(FileKind::Docx, error))?;
        if xml.len() as u64 >= MAX_DOCX_XML_BYTES {
            return Err(ExtractError::read(
                FileKind::Docx,
                format!("{DOCX_BODY_ENTRY} exceeds size limit ({MAX_DOCX_XML_BYTES} bytes)"),
            ));
        }

        let paragraphs = docx_paragraphs(&xml)?;
        Ok(paragraphs.join("\n"))
    }
}

/// Collects the run text of every `w:p`, in document order.
///
/// Nested paragraphs (text boxes) are folded into their enclosing paragraph.
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut paragraph_depth = 0usize;
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|error| ExtractError::read(FileKind::Docx, error))?
        {
            Event::Start(element) => match element.local_name().as_ref() {
                b"p" => {
                    if paragraph_depth == 0 {
                        current.clear();
                    }
                    paragraph_depth += 1;
                }
                b"t" => in_text_run = true,
                b"tab" if paragraph_depth > 0 => current.push('\t'),
                b"br" | b"cr" if paragraph_depth > 0 => current.push('\n'),
                _ => {}
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                b"p" if paragraph_depth == 0 => paragraphs.push(String::new()),
                b"tab" if paragraph_depth > 0 => current.push('\t'),
                b"br" | b"cr" if paragraph_depth > 0 => current.push('\n'),
                _ => {}
            },
            Event::Text(text) if in_text_run && paragraph_depth > 0 => {
                let unescaped = text
                    .unescape()
                    .map_err(|error| ExtractError::read(FileKind::Docx, error))?;
                current.push_str(&unescaped);
            }
            Event::CData(data) if in_text_run && paragraph_depth > 0 => {
                current.push_str(&String::from_utf8_lossy(&data));
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" if paragraph_depth > 0 => {
                    paragraph_depth -= 1;
                    if paragraph_depth == 0 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

/// Extracts plain text from a PDF or DOCX file.
///
/// Existence is checked before the extension, so a missing `notes.txt`
/// reports `NotFound` rather than `UnsupportedType`.
pub fn extract_text_from_file(path: &Path) -> Result<String, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::NotFound {
            path: path.to_path_buf(),
        });
    }

    match FileKind::from_path(path) {
        FileKind::Pdf => PdfTextExtractor.extract(path),
        FileKind::Docx => DocxTextExtractor.extract(path),
        FileKind::Unsupported => Err(ExtractError::UnsupportedType {
            path: path.to_path_buf(),
            extension: path
                .extension()
                .map(|ext| ext.to_string_lossy().to_string())
                .unwrap_or_default(),
        }),
    }
}

/// Text on success, otherwise an `Error: ...` line suitable for showing to a user.
pub fn extract_text_or_message(path: &Path) -> String {
    match extract_text_from_file(path) {
        Ok(text) => text,
        Err(error) => format!("Error: {error}"),
    }
}
