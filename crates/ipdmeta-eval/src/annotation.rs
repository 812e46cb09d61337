//! Human-annotated ground-truth table.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use ipdmeta_common::{IpdError, Result, Value};
use tracing::info;

/// A header row plus value rows, loaded from a spreadsheet or CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationTable {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl AnnotationTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    /// `.xls` / `.xlsx` (first sheet) or `.csv`; the first row holds the headers.
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let table = match ext.as_str() {
            "csv" => Self::load_csv(path)?,
            "xls" | "xlsx" | "xlsm" | "ods" => Self::load_workbook(path)?,
            other => {
                return Err(IpdError::Spreadsheet(format!(
                    "unsupported annotation format '{other}' for {}",
                    path.display()
                )))
            }
        };
        info!(
            path = %path.display(),
            rows = table.rows.len(),
            columns = table.headers.len(),
            "Loaded annotation table"
        );
        Ok(table)
    }

    fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(Value::from_cell).collect());
        }
        Ok(Self { headers, rows })
    }

    fn load_workbook(path: &Path) -> Result<Self> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| IpdError::Spreadsheet(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IpdError::Spreadsheet(format!("{} has no sheets", path.display())))?
            .map_err(|e| IpdError::Spreadsheet(e.to_string()))?;

        let mut rows_iter = range.rows();
        let headers = rows_iter
            .next()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();
        let rows = rows_iter.map(|row| row.iter().map(cell_value).collect()).collect();
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index by header; exact match first, then trimmed.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == header)
            .or_else(|| self.headers.iter().position(|h| h.trim() == header.trim()))
    }

    /// First row whose `column` equals `key` as text.
    pub fn find_row(&self, column: usize, key: &str) -> Option<&[Value]> {
        self.rows
            .iter()
            .find(|row| matches!(row.get(column), Some(Value::Text(t)) if t == key))
            .map(Vec::as_slice)
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Missing,
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => Value::from_cell(s),
        other => Value::Text(other.to_string()),
    }
}
