//! Dispatch from a file path to the right text extractor.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{docx_parser, pdf_parser, xls_parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Spreadsheet,
}

impl DocumentKind {
    /// Classify by lowercase extension. Only the formats the publication folder
    /// is known to carry are recognised.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf"          => Some(Self::Pdf),
            "docx"         => Some(Self::Docx),
            "xls" | "xlsx" => Some(Self::Spreadsheet),
            _              => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdf         => "pdf",
            Self::Docx        => "docx",
            Self::Spreadsheet => "spreadsheet",
        })
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("File not found: {0}")]
    Missing(PathBuf),

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("{kind} extraction failed for {path}: {message}")]
    Failed {
        kind: DocumentKind,
        path: PathBuf,
        message: String,
    },
}

/// Extract the text of one publication file.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::Missing(path.to_path_buf()));
    }
    let kind = DocumentKind::from_path(path).ok_or_else(|| {
        ExtractError::Unsupported(
            path.extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        )
    })?;

    let text = match kind {
        DocumentKind::Pdf => pdf_parser::parse_pdf_text(path).map(|p| p.full_text),
        DocumentKind::Docx => docx_parser::parse_docx_text(path).map(|p| p.full_text),
        DocumentKind::Spreadsheet => xls_parser::parse_workbook_text(path).map(|p| p.full_text),
    };

    text.map_err(|e| ExtractError::Failed {
        kind,
        path: path.to_path_buf(),
        message: format!("{e:#}"),
    })
}
