//! File interchange helpers: CSV column access and JSON study maps.
//!
//! Every stage hands its output to the next one (often via a human reviewer) through
//! plain files. These helpers keep the column-by-header lookups in one place.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{IpdError, Result};

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Read the named columns of a headed CSV file, one `Vec` per row in column order.
pub fn read_columns(path: &Path, columns: &[&str]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut indices = Vec::with_capacity(columns.len());
    for column in columns {
        let idx = headers
            .iter()
            .position(|h| h.trim() == *column)
            .ok_or_else(|| IpdError::MissingColumn {
                column: column.to_string(),
                path: path.display().to_string(),
            })?;
        indices.push(idx);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            indices
                .iter()
                .map(|&i| record.get(i).unwrap_or("").to_string())
                .collect(),
        );
    }
    Ok(rows)
}

/// Non-empty values of the first column of a headed CSV file.
pub fn read_first_column(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(v) = record.get(0) {
            if !v.trim().is_empty() {
                values.push(v.to_string());
            }
        }
    }
    Ok(values)
}

/// Write a headed CSV file from string rows.
pub fn write_rows<I, R>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a study → text map as pretty-printed UTF-8 JSON.
pub fn write_study_map(map: &BTreeMap<String, String>, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(map)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a study → text map written by [`write_study_map`].
pub fn read_study_map(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_columns_by_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "a,b,c\n1,2,3\n4,5,6\n").unwrap();
        let rows = read_columns(&path, &["c", "a"]).unwrap();
        assert_eq!(rows, vec![vec!["3", "1"], vec!["6", "4"]]);
    }

    #[test]
    fn test_read_columns_missing_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();
        let err = read_columns(&path, &["z"]).unwrap_err();
        assert!(matches!(err, IpdError::MissingColumn { .. }));
    }

    #[test]
    fn test_study_map_preserves_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("map.json");
        let mut map = BTreeMap::new();
        map.insert("Tituler, Höftberger - Dalmau, 2014".to_string(), "text".to_string());
        write_study_map(&map, &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("Höftberger"));
        assert_eq!(read_study_map(&path).unwrap(), map);
    }

    #[test]
    fn test_first_column_skips_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.csv");
        fs::write(&path, "0,count\n\"Kruer, 2010\",1\n,3\n\"Smith, 2012\",2\n").unwrap();
        assert_eq!(read_first_column(&path).unwrap(), vec!["Kruer, 2010", "Smith, 2012"]);
    }
}
