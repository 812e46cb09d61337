//! Per-study case counts.
//!
//! The case-count table decides both the stratification of the dataset split
//! (single case report vs. case series) and which extraction call is issued
//! for a study. Rows are kept in file order; sampling depends on that order.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{IpdError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseCount {
    pub study: String,
    pub count: u32,
}

/// Several table rows describing the same underlying study, collapsed into `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMerge {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseCountTable {
    rows: Vec<CaseCount>,
}

impl CaseCountTable {
    pub fn new(rows: Vec<CaseCount>) -> Self {
        Self { rows }
    }

    /// Load the table from a headed CSV file.
    /// Counts may be written as integers or as floats with a zero fraction ("3.0").
    pub fn load(path: &Path, study_column: &str, count_column: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| IpdError::MissingColumn {
                    column: column.to_string(),
                    path: path.display().to_string(),
                })
        };
        let study_idx = find(study_column)?;
        let count_idx = find(count_column)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let study = record.get(study_idx).unwrap_or("");
            if study.trim().is_empty() {
                continue;
            }
            let raw_count = record.get(count_idx).unwrap_or("");
            match parse_count(raw_count) {
                Some(count) => rows.push(CaseCount { study: study.to_string(), count }),
                None => warn!(study, raw_count, "Skipping case-count row with unparsable count"),
            }
        }

        info!("Loaded case counts for {} studies from {}", rows.len(), path.display());
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[CaseCount] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case count of the first row whose study equals `study`.
    pub fn count(&self, study: &str) -> Option<u32> {
        self.rows.iter().find(|r| r.study == study).map(|r| r.count)
    }

    /// Studies describing exactly one patient, in table order.
    pub fn single_case_studies(&self) -> Vec<&str> {
        self.rows.iter().filter(|r| r.count == 1).map(|r| r.study.as_str()).collect()
    }

    /// Studies describing more than one patient, in table order.
    pub fn case_series_studies(&self) -> Vec<&str> {
        self.rows.iter().filter(|r| r.count > 1).map(|r| r.study.as_str()).collect()
    }

    /// Collapse the member rows of `merge` into one appended row with the summed count.
    /// Returns the merged count, or `None` when no member row was present.
    pub fn merge(&mut self, merge: &CaseMerge) -> Option<u32> {
        let (members, rest): (Vec<CaseCount>, Vec<CaseCount>) = std::mem::take(&mut self.rows)
            .into_iter()
            .partition(|r| merge.members.contains(&r.study));
        self.rows = rest;

        if members.is_empty() {
            warn!(name = %merge.name, "No case-count rows found for merge group");
            return None;
        }

        let total: u32 = members.iter().map(|r| r.count).sum();
        debug!(name = %merge.name, rows = members.len(), total, "Merged case-count rows");
        self.rows.push(CaseCount { study: merge.name.clone(), count: total });
        Some(total)
    }

    /// Remove every row for `study`. Returns whether anything was removed.
    pub fn remove(&mut self, study: &str) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r.study != study);
        before != self.rows.len()
    }

    /// Apply the configured merges, then drop studies whose sources are unreadable.
    pub fn normalise(&mut self, merges: &[CaseMerge], unreadable: &[String]) {
        for merge in merges {
            self.merge(merge);
        }
        for study in unreadable {
            if !self.remove(study) {
                warn!(study = %study, "Unreadable study not present in case-count table");
            }
        }
        info!("Case-count table normalised: {} studies", self.rows.len());
    }
}

fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(rows: &[(&str, u32)]) -> CaseCountTable {
        CaseCountTable::new(
            rows.iter()
                .map(|(s, c)| CaseCount { study: s.to_string(), count: *c })
                .collect(),
        )
    }

    #[test]
    fn test_parse_count_accepts_float_integers() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("3.0"), Some(3));
        assert_eq!(parse_count("2.5"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_stratification_keeps_table_order() {
        let t = table(&[("A", 1), ("B", 4), ("C", 1), ("D", 0), ("E", 2)]);
        assert_eq!(t.single_case_studies(), vec!["A", "C"]);
        assert_eq!(t.case_series_studies(), vec!["B", "E"]);
    }

    #[test]
    fn test_merge_sums_and_appends() {
        let mut t = table(&[("Dalmau, 2014", 10), ("X", 1), ("Dalmau, 2014\n\nKruer, 2010", 1)]);
        let merged = t.merge(&CaseMerge {
            name: "Dalmau, 2014".to_string(),
            members: vec!["Dalmau, 2014".to_string(), "Dalmau, 2014\n\nKruer, 2010".to_string()],
        });
        assert_eq!(merged, Some(11));
        assert_eq!(t.rows().last().unwrap(), &CaseCount { study: "Dalmau, 2014".to_string(), count: 11 });
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_merge_without_members_is_noop() {
        let mut t = table(&[("X", 1)]);
        let merged = t.merge(&CaseMerge { name: "Y".to_string(), members: vec!["Z".to_string()] });
        assert_eq!(merged, None);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_normalise_removes_unreadable() {
        let mut t = table(&[("Raynor -Berkowitz, 2016", 1), ("X", 2)]);
        t.normalise(&[], &["Raynor -Berkowitz, 2016".to_string()]);
        assert_eq!(t.count("Raynor -Berkowitz, 2016"), None);
        assert_eq!(t.count("X"), Some(2));
    }

    #[test]
    fn test_load_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.csv");
        std::fs::write(&path, "0,count\n\"Kruer, 2010\",1\n\"Smith, 2012\",3.0\nbroken,abc\n").unwrap();
        let t = CaseCountTable::load(&path, "0", "count").unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.count("Smith, 2012"), Some(3));
    }
}
