//! DOCX text extraction: reads `word/document.xml` out of the zip container
//! and emits one line per paragraph.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";

/// Parsed DOCX document.
#[derive(Debug, Clone)]
pub struct ParsedDocx {
    pub full_text: String,
    pub paragraph_count: usize,
}

pub fn parse_docx_text(docx_path: &Path) -> Result<ParsedDocx> {
    let file = File::open(docx_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a zip container", docx_path.display()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .with_context(|| format!("{} has no {DOCUMENT_PART}", docx_path.display()))?
        .read_to_string(&mut xml)?;

    let parsed = paragraphs_from_xml(&xml)?;
    debug!(path = %docx_path.display(), paragraphs = parsed.paragraph_count, "Parsed DOCX");
    Ok(parsed)
}

/// Walk WordprocessingML and collect the text runs of each `<w:p>`.
///
/// `<w:tab/>` becomes a tab and `<w:br/>` a newline inside the paragraph.
pub fn paragraphs_from_xml(xml: &str) -> Result<ParsedDocx> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_paragraph => current.push('\t'),
                b"br" if in_paragraph => current.push('\n'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape()?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    in_paragraph = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ParsedDocx {
        paragraph_count: paragraphs.len(),
        full_text: paragraphs.join("\n"),
    })
}
