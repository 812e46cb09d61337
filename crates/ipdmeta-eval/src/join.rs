//! Join extracted records to annotation rows by study name.

use std::collections::BTreeMap;

use ipdmeta_common::records::{
    COL_AGE, COL_HOSPITAL_STAY, COL_SEX, COL_SYMPTOM_GROUPS, COL_T2_FLAIR, COL_TUMOR,
};
use ipdmeta_common::{IpdError, PatientRecord, Result, Value};
use tracing::{info, warn};

use crate::annotation::AnnotationTable;

pub const DEFAULT_STUDY_COLUMN: &str = "First author - Last author, year";

/// Extracted column → annotation column.
pub type FieldMapping = Vec<(String, String)>;

/// Column names of the annotation spreadsheet the pipeline was built against.
pub fn default_field_mapping() -> FieldMapping {
    [
        (COL_AGE, "Age at disease onset (years)\n\nblank=Not available"),
        (COL_SEX, "Gender\n\n0=Male\n1=Female\nblank=Not available"),
        (COL_TUMOR, "Tumor\n\n0=No\n1=Yes\nblank=Not available"),
        (COL_SYMPTOM_GROUPS, "Number of main group of symptoms"),
        (COL_HOSPITAL_STAY, "Lenght of hospital stay (days) \n\nblank=Not available"),
        (COL_T2_FLAIR, "T2 and FLAIR hyperintensities"),
    ]
    .into_iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect()
}

/// One extracted patient next to its annotated counterpart, keyed by extracted column name.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPair {
    pub study: String,
    pub patient_idx: usize,
    pub y_true: BTreeMap<String, Value>,
    pub y_pred: BTreeMap<String, Value>,
}

impl MatchedPair {
    pub fn values(&self, feature: &str) -> (&Value, &Value) {
        (
            self.y_true.get(feature).unwrap_or(&Value::Missing),
            self.y_pred.get(feature).unwrap_or(&Value::Missing),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    pub pairs: Vec<MatchedPair>,
    /// Studies with no annotation row; their records are left out of `pairs`.
    pub unmatched_studies: Vec<String>,
}

/// Pair each record with the first annotation row whose study column equals
/// the record's study.
pub fn create_matches(
    records: &[PatientRecord],
    table: &AnnotationTable,
    study_column: &str,
    mapping: &FieldMapping,
) -> Result<JoinOutcome> {
    let study_idx = table.column_index(study_column).ok_or_else(|| IpdError::MissingColumn {
        column: study_column.to_string(),
        path: "annotation table".to_string(),
    })?;

    let columns: Vec<(&str, Option<usize>)> = mapping
        .iter()
        .map(|(pred_col, true_col)| {
            let idx = table.column_index(true_col);
            if idx.is_none() {
                warn!(feature = %pred_col, column = ?true_col, "Annotation column not found, all values treated as missing");
            }
            (pred_col.as_str(), idx)
        })
        .collect();

    let mut outcome = JoinOutcome::default();
    for (patient_idx, record) in records.iter().enumerate() {
        let Some(row) = table.find_row(study_idx, &record.study) else {
            if !outcome.unmatched_studies.contains(&record.study) {
                warn!(study = %record.study, "No annotation row for study, skipping its records");
                outcome.unmatched_studies.push(record.study.clone());
            }
            continue;
        };

        let mut y_true = BTreeMap::new();
        let mut y_pred = BTreeMap::new();
        for (pred_col, true_idx) in &columns {
            let truth = true_idx
                .and_then(|i| row.get(i).cloned())
                .unwrap_or(Value::Missing);
            y_true.insert(pred_col.to_string(), truth);
            y_pred.insert(pred_col.to_string(), record.feature(pred_col).unwrap_or(Value::Missing));
        }

        outcome.pairs.push(MatchedPair {
            study: record.study.clone(),
            patient_idx,
            y_true,
            y_pred,
        });
    }

    info!(
        pairs = outcome.pairs.len(),
        unmatched = outcome.unmatched_studies.len(),
        "Joined extracted records to annotations"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> AnnotationTable {
        let mapping = default_field_mapping();
        let mut headers = vec![DEFAULT_STUDY_COLUMN.to_string()];
        headers.extend(mapping.iter().map(|(_, h)| h.clone()));
        AnnotationTable::new(
            headers,
            vec![
                vec![
                    Value::Text("Kruer, 2010".to_string()),
                    Value::Number(23.0),
                    Value::Number(1.0),
                    Value::Number(0.0),
                    Value::Number(4.0),
                    Value::Missing,
                    Value::Text("Normal".to_string()),
                ],
                vec![Value::Text("Kruer, 2010".to_string()), Value::Number(99.0)],
            ],
        )
    }

    #[test]
    fn test_create_matches_uses_first_row() {
        let mut rec = PatientRecord::empty("Kruer, 2010", 1.0);
        rec.age_years = Some(25.0);
        rec.sex = Some(1);
        let outcome = create_matches(&[rec], &table(), DEFAULT_STUDY_COLUMN, &default_field_mapping()).unwrap();

        assert_eq!(outcome.pairs.len(), 1);
        let pair = &outcome.pairs[0];
        assert_eq!(pair.values(COL_AGE), (&Value::Number(23.0), &Value::Number(25.0)));
        assert_eq!(pair.values(COL_SEX), (&Value::Number(1.0), &Value::Number(1.0)));
        assert_eq!(pair.values(COL_HOSPITAL_STAY), (&Value::Missing, &Value::Missing));
        assert_eq!(pair.values(COL_T2_FLAIR).0, &Value::Text("Normal".to_string()));
    }

    #[test]
    fn test_unmatched_studies_are_listed_once() {
        let records = vec![
            PatientRecord::empty("Ghost, 1999", 1.0),
            PatientRecord::empty("Ghost, 1999", 1.0),
            PatientRecord::empty("Kruer, 2010", 1.0),
        ];
        let outcome = create_matches(&records, &table(), DEFAULT_STUDY_COLUMN, &default_field_mapping()).unwrap();
        assert_eq!(outcome.unmatched_studies, vec!["Ghost, 1999"]);
        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.pairs[0].patient_idx, 2);
    }

    #[test]
    fn test_missing_study_column_is_an_error() {
        let err = create_matches(&[], &table(), "Study", &default_field_mapping()).unwrap_err();
        assert!(matches!(err, IpdError::MissingColumn { .. }));
    }
}
