//! Cleaning and parsing of model output into patient records.

use ipdmeta_common::records::canonical_t2_flair;
use ipdmeta_common::PatientRecord;
use serde_json::{Map, Value as Json};
use thiserror::Error;
use tracing::warn;

use crate::backend::LlmError;
use crate::prompt::{KEY_AGE, KEY_HOSPITAL_STAY, KEY_SEX, KEY_SYMPTOM_GROUPS, KEY_T2_FLAIR, KEY_TUMOR};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    InvalidShape(String),

    #[error("No case count for study '{0}'")]
    MissingCaseCount(String),

    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),
}

/// Trim and drop a surrounding markdown code fence (```` ```json ```` or bare ```` ``` ````).
pub fn strip_code_fence(raw: &str) -> &str {
    let s = raw.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

/// Parse a single-patient response. An object, or an array whose first
/// element is an object, is accepted.
pub fn parse_case_report(study: &str, duration_secs: f64, raw: &str) -> Result<PatientRecord, ExtractionError> {
    let data: Json = serde_json::from_str(strip_code_fence(raw))?;
    let obj = match &data {
        Json::Object(obj) => obj,
        Json::Array(items) => match items.first() {
            Some(Json::Object(obj)) => obj,
            Some(other) => {
                return Err(ExtractionError::InvalidShape(format!(
                    "first array element is {}",
                    kind_of(other)
                )))
            }
            None => return Err(ExtractionError::InvalidShape("empty array".to_string())),
        },
        other => return Err(ExtractionError::InvalidShape(format!("top level is {}", kind_of(other)))),
    };
    Ok(record_from_object(study, duration_secs, obj))
}

/// Parse a multi-patient response into one record per patient object.
pub fn parse_case_series(study: &str, duration_secs: f64, raw: &str) -> Result<Vec<PatientRecord>, ExtractionError> {
    let data: Json = serde_json::from_str(strip_code_fence(raw))?;
    match data {
        Json::Array(items) => {
            if items.is_empty() {
                warn!(study, "Case series response contains no patients");
            }
            items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Json::Object(obj) => Ok(record_from_object(study, duration_secs, obj)),
                    other => Err(ExtractionError::InvalidShape(format!(
                        "element {i} is {}",
                        kind_of(other)
                    ))),
                })
                .collect()
        }
        Json::Object(obj) => {
            warn!(study, "Case series response is a single object, treating as one patient");
            Ok(vec![record_from_object(study, duration_secs, &obj)])
        }
        other => Err(ExtractionError::InvalidShape(format!("top level is {}", kind_of(&other)))),
    }
}

fn kind_of(v: &Json) -> &'static str {
    match v {
        Json::Null      => "null",
        Json::Bool(_)   => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_)  => "an array",
        Json::Object(_) => "an object",
    }
}

fn record_from_object(study: &str, duration_secs: f64, obj: &Map<String, Json>) -> PatientRecord {
    PatientRecord {
        study: study.to_string(),
        duration_secs,
        age_years: number_field(study, obj, KEY_AGE),
        sex: binary_field(study, obj, KEY_SEX),
        tumor: binary_field(study, obj, KEY_TUMOR),
        symptom_groups: number_field(study, obj, KEY_SYMPTOM_GROUPS),
        hospital_stay_days: number_field(study, obj, KEY_HOSPITAL_STAY),
        t2_flair: t2_flair_field(study, obj),
    }
}

fn number_field(study: &str, obj: &Map<String, Json>, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Json::Null => None,
        Json::Number(n) => n.as_f64(),
        Json::String(s) if s.trim().is_empty() => None,
        Json::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                warn!(study, field = key, value = %s, "Non-numeric value, treating as missing");
                None
            }
        },
        other => {
            warn!(study, field = key, value = %other, "Unexpected value type, treating as missing");
            None
        }
    }
}

fn binary_field(study: &str, obj: &Map<String, Json>, key: &str) -> Option<u8> {
    let v = number_field(study, obj, key)?;
    if v == 0.0 {
        Some(0)
    } else if v == 1.0 {
        Some(1)
    } else {
        warn!(study, field = key, value = v, "Binary field outside 0/1, treating as missing");
        None
    }
}

fn t2_flair_field(study: &str, obj: &Map<String, Json>) -> Option<String> {
    match obj.get(KEY_T2_FLAIR)? {
        Json::Null => None,
        Json::String(s) if s.trim().is_empty() => None,
        Json::String(s) => match canonical_t2_flair(s) {
            Some(code) => Some(code.to_string()),
            None => {
                warn!(study, field = KEY_T2_FLAIR, value = %s, "Unknown T2/FLAIR code, treating as missing");
                None
            }
        },
        other => {
            warn!(study, field = KEY_T2_FLAIR, value = %other, "Unexpected value type, treating as missing");
            None
        }
    }
}
