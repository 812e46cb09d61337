//! lopdf-based PDF text extraction.

use anyhow::Result;
use std::path::Path;

use lopdf::Document as PdfDoc;
use tracing::debug;

/// Parsed PDF document.
#[derive(Debug, Clone)]
pub struct ParsedPdf {
    pub full_text: String,
    pub page_count: usize,
    /// Pages that yielded no text (scanned images, broken content streams).
    pub empty_pages: Vec<u32>,
}

/// Extract the text of every page, in page order.
///
/// Pages without text are skipped; every non-empty page is followed by a newline.
pub fn parse_pdf_text(pdf_path: &Path) -> Result<ParsedPdf> {
    let pdf = PdfDoc::load(pdf_path)?;

    let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
    let mut full_text = String::new();
    let mut empty_pages = Vec::new();

    for page_num in &page_numbers {
        match pdf.extract_text(&[*page_num]) {
            Ok(page_text) if !page_text.trim().is_empty() => {
                full_text.push_str(&page_text);
                full_text.push('\n');
            }
            Ok(_) => empty_pages.push(*page_num),
            Err(e) => {
                debug!(page = page_num, error = %e, "Page text extraction failed");
                empty_pages.push(*page_num);
            }
        }
    }

    debug!(
        path = %pdf_path.display(),
        pages = page_numbers.len(),
        empty = empty_pages.len(),
        "Parsed PDF"
    );

    Ok(ParsedPdf {
        full_text,
        page_count: page_numbers.len(),
        empty_pages,
    })
}
