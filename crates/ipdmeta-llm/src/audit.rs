//! Audit trail for LLM calls: one JSON line per call.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::backend::LlmResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuditEntry {
    pub id: Uuid,
    pub study: String,
    pub model: String,
    pub backend: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub output_hash: String,
    pub latency_ms: u64,
    pub called_at: chrono::DateTime<Utc>,
}

impl LlmAuditEntry {
    /// Record one completed call. The reply itself is only kept as a hash.
    pub fn from_response(study: &str, backend: &str, response: &LlmResponse, latency: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            study: study.to_string(),
            model: response.model.clone(),
            backend: backend.to_string(),
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
            output_hash: output_hash(&response.content),
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            called_at: Utc::now(),
        }
    }
}

/// Lowercase hex SHA-256 of the model output.
pub fn output_hash(output: &str) -> String {
    Sha256::digest(output.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Append entries to a JSON-lines file, creating it (and its parent) if needed.
pub fn append_audit_log(entries: &[LlmAuditEntry], path: &Path) -> ipdmeta_common::Result<()> {
    ipdmeta_common::interchange::ensure_parent(path)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_output_hash_is_sha256_hex() {
        assert_eq!(
            output_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_append_writes_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("pilot_audit.jsonl");
        let response = LlmResponse {
            content: "[]".to_string(),
            model: "gemini-2.0-flash-lite".to_string(),
            prompt_tokens: 100,
            completion_tokens: 20,
        };
        let entry = LlmAuditEntry::from_response("Kruer, 2010", "gemini", &response, Duration::from_millis(350));
        assert_eq!(entry.latency_ms, 350);
        append_audit_log(&[entry.clone()], &path).unwrap();
        append_audit_log(&[entry], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: LlmAuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.study, "Kruer, 2010");
        assert_eq!(parsed.output_hash, output_hash("[]"));
    }
}
