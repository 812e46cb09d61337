//! Spreadsheet text extraction (legacy `.xls` and `.xlsx`) through calamine.

use std::path::Path;

use anyhow::Result;
use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

/// Parsed workbook.
#[derive(Debug, Clone)]
pub struct ParsedWorkbook {
    pub full_text: String,
    pub sheet_count: usize,
}

/// Every sheet, every row: non-empty cells joined by tabs, rows by newlines.
pub fn parse_workbook_text(path: &Path) -> Result<ParsedWorkbook> {
    let mut workbook = open_workbook_auto(path)?;

    let mut lines = Vec::new();
    let sheets = workbook.worksheets();
    for (name, range) in &sheets {
        debug!(sheet = %name, rows = range.height(), "Reading sheet");
        for row in range.rows() {
            lines.push(row_text(row));
        }
    }

    Ok(ParsedWorkbook {
        full_text: lines.join("\n"),
        sheet_count: sheets.len(),
    })
}

pub(crate) fn row_text(row: &[Data]) -> String {
    row.iter()
        .filter(|cell| !matches!(cell, Data::Empty))
        .map(cell_text)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\t")
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
