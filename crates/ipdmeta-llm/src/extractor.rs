//! Sequential batch extraction over a dataset split.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ipdmeta_common::interchange::write_rows;
use ipdmeta_common::records::write_records;
use ipdmeta_common::{CaseCountTable, PatientRecord, SplitName};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audit::{append_audit_log, LlmAuditEntry};
use crate::backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
use crate::prompt::EXTRACTION_PROMPT;
use crate::response::{parse_case_report, parse_case_series, ExtractionError};

/// What to do when one study cannot be extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and move on to the next study.
    #[default]
    Skip,
    /// Stop the batch and return the error.
    Abort,
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Pause after every model call.
    pub request_delay: Duration,
    pub on_failure: FailurePolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: None,
            request_delay: Duration::from_secs(5),
            on_failure: FailurePolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyFailure {
    #[serde(rename = "Study")]
    pub study: String,
    #[serde(rename = "Error")]
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<PatientRecord>,
    pub failures: Vec<StudyFailure>,
    pub audit: Vec<LlmAuditEntry>,
}

impl BatchOutcome {
    /// Write `{split}_output.csv`, `{split}_failures.csv` and `{split}_audit.jsonl` into `dir`.
    pub fn write(&self, dir: &Path, split: SplitName) -> ipdmeta_common::Result<Vec<PathBuf>> {
        let output = dir.join(split.output_file());
        write_records(&self.records, &output)?;

        let failures = dir.join(split.failures_file());
        write_rows(
            &failures,
            &["Study", "Error"],
            self.failures.iter().map(|f| [f.study.as_str(), f.error.as_str()]),
        )?;

        let audit = dir.join(split.audit_file());
        if audit.exists() {
            std::fs::remove_file(&audit)?;
        }
        append_audit_log(&self.audit, &audit)?;

        Ok(vec![output, failures, audit])
    }
}

pub struct FeatureExtractor {
    backend: Arc<dyn LlmBackend>,
    prompt: String,
    config: ExtractorConfig,
}

impl FeatureExtractor {
    pub fn new(backend: Arc<dyn LlmBackend>, config: ExtractorConfig) -> Self {
        Self { backend, prompt: EXTRACTION_PROMPT.to_string(), config }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Send the prompt and a document as two user parts; return the raw reply text.
    pub async fn extract(&self, prompt: &str, text: &str) -> Result<String, LlmError> {
        Ok(self.complete(prompt, text).await?.content)
    }

    async fn complete(&self, prompt: &str, text: &str) -> Result<LlmResponse, LlmError> {
        let req = LlmRequest {
            messages: vec![Message::user(prompt), Message::user(text)],
            model: None,
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
        };
        self.backend.complete(req).await
    }

    /// Extract every study in `dataset`, one model call per study.
    ///
    /// Studies with exactly one case are parsed as case reports, the rest as
    /// case series. Under [`FailurePolicy::Skip`] failed studies are listed in
    /// the outcome; under [`FailurePolicy::Abort`] the first failure is returned.
    pub async fn batch_feature_extraction(
        &self,
        dataset: &BTreeMap<String, String>,
        counts: &CaseCountTable,
    ) -> Result<BatchOutcome, ExtractionError> {
        let mut outcome = BatchOutcome::default();
        let total = dataset.len();

        for (i, (study, text)) in dataset.iter().enumerate() {
            info!(n = i + 1, total, study = %study, "Extracting study");
            match self.extract_study(study, text, counts, &mut outcome.audit).await {
                Ok(records) => {
                    debug!(study = %study, patients = records.len(), "Study extracted");
                    outcome.records.extend(records);
                }
                Err(e) => match self.config.on_failure {
                    FailurePolicy::Skip => {
                        warn!(study = %study, error = %e, "Extraction failed, skipping study");
                        outcome.failures.push(StudyFailure { study: study.clone(), error: e.to_string() });
                    }
                    FailurePolicy::Abort => return Err(e),
                },
            }
        }

        info!(
            studies = total,
            records = outcome.records.len(),
            failures = outcome.failures.len(),
            model = self.backend.model_id(),
            "Batch extraction finished"
        );
        Ok(outcome)
    }

    async fn extract_study(
        &self,
        study: &str,
        text: &str,
        counts: &CaseCountTable,
        audit: &mut Vec<LlmAuditEntry>,
    ) -> Result<Vec<PatientRecord>, ExtractionError> {
        let n_cases = counts
            .count(study)
            .ok_or_else(|| ExtractionError::MissingCaseCount(study.to_string()))?;

        let started = Instant::now();
        let result = self.complete(&self.prompt, text).await;
        let elapsed = started.elapsed();

        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }

        let response = result?;
        audit.push(LlmAuditEntry::from_response(study, self.backend.backend_name(), &response, elapsed));
        debug!(study, response = %response.content, "Model response");

        let duration = elapsed.as_secs_f64();
        if n_cases == 1 {
            Ok(vec![parse_case_report(study, duration, &response.content)?])
        } else {
            parse_case_series(study, duration, &response.content)
        }
    }
}
