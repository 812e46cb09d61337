//! Configuration loading for ipdmeta.
//! Reads ipdmeta.toml from the path given by `--config` / IPDMETA_CONFIG.
//! Every key has a default; the defaults reproduce the published pipeline run.

use std::path::{Path, PathBuf};

use ipdmeta_common::CaseMerge;
use ipdmeta_eval::FeatureSpec;
use ipdmeta_ingestion::SplitConfig;
use ipdmeta_llm::{BackendKind, FailurePolicy};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub cases: CasesConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub structuring: StructuringConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

// ── paths ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_cases_csv")]
    pub cases_csv: PathBuf,
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,
    #[serde(default = "default_matching_outputs")]
    pub matching_outputs: PathBuf,
    #[serde(default = "default_manual_edited")]
    pub manual_edited: PathBuf,
    #[serde(default = "default_preprocess_outputs")]
    pub preprocess_outputs: PathBuf,
    #[serde(default = "default_extracted_dir")]
    pub extracted_dir: PathBuf,
    #[serde(default = "default_metrics_dir")]
    pub metrics_dir: PathBuf,
    #[serde(default = "default_annotations")]
    pub annotations: PathBuf,
}

fn default_cases_csv()          -> PathBuf { PathBuf::from("Cases per paper.csv") }
fn default_files_dir()          -> PathBuf { PathBuf::from("publication_files") }
fn default_matching_outputs()   -> PathBuf { PathBuf::from("matching_outputs") }
fn default_manual_edited()      -> PathBuf { PathBuf::from("manual_edited") }
fn default_preprocess_outputs() -> PathBuf { PathBuf::from("preprocess_outputs") }
fn default_extracted_dir()      -> PathBuf { PathBuf::from("LLM_extracted_IPD") }
fn default_metrics_dir()        -> PathBuf { PathBuf::from("accuracy_metrics") }
fn default_annotations() -> PathBuf {
    PathBuf::from(
        "NMDARE SR for STATISTICS 2021.01.26 1551 pts (excluding 16 Ab-neg and 83 post-infect) FINAL BEFORE CLEANING.xls",
    )
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cases_csv: default_cases_csv(),
            files_dir: default_files_dir(),
            matching_outputs: default_matching_outputs(),
            manual_edited: default_manual_edited(),
            preprocess_outputs: default_preprocess_outputs(),
            extracted_dir: default_extracted_dir(),
            metrics_dir: default_metrics_dir(),
            annotations: default_annotations(),
        }
    }
}

// ── cases ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CasesConfig {
    #[serde(default = "default_study_column")]
    pub study_column: String,
    #[serde(default = "default_count_column")]
    pub count_column: String,
}

fn default_study_column() -> String { "0".to_string() }
fn default_count_column() -> String { "count".to_string() }

impl Default for CasesConfig {
    fn default() -> Self {
        Self { study_column: default_study_column(), count_column: default_count_column() }
    }
}

// ── matching ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Leading path component rewritten in the review file so paths point at
    /// the reviewer's working copy. Empty disables the rewrite.
    #[serde(default = "default_review_path_from")]
    pub review_path_from: String,
    #[serde(default = "default_review_path_to")]
    pub review_path_to: String,
}

fn default_review_path_from() -> String { "publication_files".to_string() }
fn default_review_path_to()   -> String { "NMDARE SR articles".to_string() }

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { review_path_from: default_review_path_from(), review_path_to: default_review_path_to() }
    }
}

// ── structuring ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StructuringConfig {
    /// Combined entries whose content also appears under another study name.
    #[serde(default = "default_duplicate_studies")]
    pub duplicate_studies: Vec<String>,
    #[serde(default = "default_unreadable_studies")]
    pub unreadable_studies: Vec<String>,
    /// Case-count rows collapsed into one study before the split.
    #[serde(default = "default_merges")]
    pub merges: Vec<CaseMerge>,
    #[serde(default)]
    pub split: SplitConfig,
}

const DALMAU_2014: &str = "Tituler, Höftberger - Dalmau, 2014";
const PRUSS_WANDINGER_2010: &str = "Prüss-Wandinger, 2010";

fn default_duplicate_studies() -> Vec<String> {
    vec![
        format!("{DALMAU_2014}\n\nKruer, 2010"),
        format!("{DALMAU_2014}\n\nYamamoto, 2013\n\nKokubun, 2016"),
        format!("{DALMAU_2014}\n\nSakamoto, 2013"),
        format!("{PRUSS_WANDINGER_2010} and Finke, 2012"),
    ]
}

fn default_unreadable_studies() -> Vec<String> {
    vec!["Raynor -Berkowitz, 2016".to_string()]
}

fn default_merges() -> Vec<CaseMerge> {
    let duplicates = default_duplicate_studies();
    let mut dalmau = vec![DALMAU_2014.to_string()];
    dalmau.extend(duplicates[..3].iter().cloned());
    vec![
        CaseMerge { name: DALMAU_2014.to_string(), members: dalmau },
        CaseMerge {
            name: PRUSS_WANDINGER_2010.to_string(),
            members: vec![PRUSS_WANDINGER_2010.to_string(), duplicates[3].clone()],
        },
    ]
}

impl Default for StructuringConfig {
    fn default() -> Self {
        Self {
            duplicate_studies: default_duplicate_studies(),
            unreadable_studies: default_unreadable_studies(),
            merges: default_merges(),
            split: SplitConfig::default(),
        }
    }
}

impl StructuringConfig {
    /// Every study key dropped from the text map.
    pub fn excluded_studies(&self) -> Vec<String> {
        self.duplicate_studies
            .iter()
            .chain(&self.unreadable_studies)
            .cloned()
            .collect()
    }
}

// ── llm ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_backend_kind")]
    pub kind: BackendKind,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Falls back to the backend's IPDMETA_<BACKEND>_API_KEY variable.
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    #[serde(default = "default_request_delay_secs")]
    pub request_delay_secs: f64,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

fn default_backend_kind()       -> BackendKind { BackendKind::Gemini }
fn default_llm_model()          -> String { "gemini-2.0-flash-lite".to_string() }
fn default_request_delay_secs() -> f64 { 5.0 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            model: default_llm_model(),
            api_key: None,
            base_url: None,
            temperature: 0.0,
            max_tokens: None,
            request_delay_secs: default_request_delay_secs(),
            on_failure: FailurePolicy::default(),
        }
    }
}

impl LlmConfig {
    /// Configured key, else the backend's environment variable.
    pub fn resolved_api_key(&self) -> Option<SecretString> {
        if let Some(key) = &self.api_key {
            return Some(key.clone());
        }
        std::env::var(self.kind.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
    }
}

// ── evaluation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldMap {
    pub extracted: String,
    pub annotation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_annotation_study_column")]
    pub study_column: String,
    #[serde(default = "default_field_mapping")]
    pub field_mapping: Vec<FieldMap>,
    #[serde(default = "ipdmeta_eval::default_features")]
    pub features: Vec<FeatureSpec>,
}

fn default_annotation_study_column() -> String {
    ipdmeta_eval::join::DEFAULT_STUDY_COLUMN.to_string()
}

fn default_field_mapping() -> Vec<FieldMap> {
    ipdmeta_eval::default_field_mapping()
        .into_iter()
        .map(|(extracted, annotation)| FieldMap { extracted, annotation })
        .collect()
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            study_column: default_annotation_study_column(),
            field_mapping: default_field_mapping(),
            features: ipdmeta_eval::default_features(),
        }
    }
}

impl EvaluationConfig {
    pub fn mapping(&self) -> ipdmeta_eval::FieldMapping {
        self.field_mapping
            .iter()
            .map(|m| (m.extracted.clone(), m.annotation.clone()))
            .collect()
    }
}

mod tests;

impl Config {
    /// Load configuration from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!(
                "Config file not found: {} (using built-in defaults). \
                 Copy ipdmeta.example.toml to ipdmeta.toml to customise.",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
