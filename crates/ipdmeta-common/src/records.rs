//! Patient-level feature records produced by the extractor and consumed by the evaluator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::Value;

pub const COL_STUDY: &str = "Study";
pub const COL_DURATION: &str = "Duration";
pub const COL_AGE: &str = "Age (years)";
pub const COL_SEX: &str = "Sex";
pub const COL_TUMOR: &str = "Tumor";
pub const COL_SYMPTOM_GROUPS: &str = "Number of Main Group of Symptoms";
pub const COL_HOSPITAL_STAY: &str = "Length of Hospital Stay (days)";
pub const COL_T2_FLAIR: &str = "T2 and FLAIR Hyperintensities";

/// The six extracted feature columns, in output order.
pub const FEATURE_COLUMNS: [&str; 6] = [
    COL_AGE,
    COL_SEX,
    COL_TUMOR,
    COL_SYMPTOM_GROUPS,
    COL_HOSPITAL_STAY,
    COL_T2_FLAIR,
];

/// Allowed codes for the T2/FLAIR finding, as listed in the extraction prompt.
pub const T2_FLAIR_CODES: [&str; 8] = [
    "y",
    "Normal",
    "MRI n.a./not done",
    "n",
    "CT Normal",
    "Abnormal",
    "n.a.",
    "Previous head trauma Abnormal",
];

/// Canonicalise a T2/FLAIR finding against [`T2_FLAIR_CODES`] (case-insensitive).
pub fn canonical_t2_flair(raw: &str) -> Option<&'static str> {
    let needle = raw.trim();
    T2_FLAIR_CODES
        .iter()
        .copied()
        .find(|code| code.eq_ignore_ascii_case(needle))
}

/// One patient extracted from one study. Case series produce several records per study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "Study")]
    pub study: String,
    /// Wall-clock seconds spent on the model call that produced this record.
    #[serde(rename = "Duration")]
    pub duration_secs: f64,
    #[serde(rename = "Age (years)")]
    pub age_years: Option<f64>,
    /// 0 = male, 1 = female
    #[serde(rename = "Sex")]
    pub sex: Option<u8>,
    /// 0 = no, 1 = yes
    #[serde(rename = "Tumor")]
    pub tumor: Option<u8>,
    #[serde(rename = "Number of Main Group of Symptoms")]
    pub symptom_groups: Option<f64>,
    #[serde(rename = "Length of Hospital Stay (days)")]
    pub hospital_stay_days: Option<f64>,
    #[serde(rename = "T2 and FLAIR Hyperintensities")]
    pub t2_flair: Option<String>,
}

impl PatientRecord {
    /// A record with every feature missing.
    pub fn empty(study: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            study: study.into(),
            duration_secs,
            age_years: None,
            sex: None,
            tumor: None,
            symptom_groups: None,
            hospital_stay_days: None,
            t2_flair: None,
        }
    }

    /// Look up a feature by its output column name.
    pub fn feature(&self, column: &str) -> Option<Value> {
        let value = match column {
            COL_AGE => self.age_years.into(),
            COL_SEX => self.sex.map(f64::from).into(),
            COL_TUMOR => self.tumor.map(f64::from).into(),
            COL_SYMPTOM_GROUPS => self.symptom_groups.into(),
            COL_HOSPITAL_STAY => self.hospital_stay_days.into(),
            COL_T2_FLAIR => self.t2_flair.clone().into(),
            _ => return None,
        };
        Some(value)
    }
}

/// Write records as CSV with the fixed eight-column header.
pub fn write_records(records: &[PatientRecord], path: &Path) -> Result<()> {
    crate::interchange::ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    if records.is_empty() {
        writer.write_record([
            COL_STUDY,
            COL_DURATION,
            COL_AGE,
            COL_SEX,
            COL_TUMOR,
            COL_SYMPTOM_GROUPS,
            COL_HOSPITAL_STAY,
            COL_T2_FLAIR,
        ])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read records previously written by [`write_records`].
pub fn read_records(path: &Path) -> Result<Vec<PatientRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}
