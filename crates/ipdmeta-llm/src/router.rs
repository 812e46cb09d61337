//! Backend selection from configuration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::{ChatCompletionsBackend, GeminiBackend, LlmBackend, LlmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Gemini,
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    #[serde(rename = "openai_compatible", alias = "compatible")]
    OpenAiCompatible,
    Ollama,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini           => "gemini",
            Self::OpenAi           => "openai",
            Self::OpenAiCompatible => "openai_compatible",
            Self::Ollama           => "ollama",
        }
    }

    /// Environment variable consulted when no API key is configured.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini           => "IPDMETA_GEMINI_API_KEY",
            Self::OpenAi           => "IPDMETA_OPENAI_API_KEY",
            Self::OpenAiCompatible => "IPDMETA_COMPAT_API_KEY",
            Self::Ollama           => "IPDMETA_OLLAMA_API_KEY",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "gemini"                                   => Ok(Self::Gemini),
            "openai" | "open_ai"                       => Ok(Self::OpenAi),
            "openai_compatible" | "compatible"         => Ok(Self::OpenAiCompatible),
            "ollama"                                   => Ok(Self::Ollama),
            other => Err(format!("unknown backend kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
}

/// Instantiate the configured backend.
pub fn build_backend(config: BackendConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let missing_key = || {
        LlmError::Unavailable(format!(
            "{} backend needs an API key (set llm.api_key or {})",
            config.kind,
            config.kind.api_key_env()
        ))
    };

    let backend: Arc<dyn LlmBackend> = match config.kind {
        BackendKind::Gemini => {
            let key = config.api_key.clone().ok_or_else(missing_key)?;
            let mut b = GeminiBackend::new(key, config.model.clone());
            if let Some(url) = &config.base_url {
                b = b.with_base_url(url.clone());
            }
            Arc::new(b)
        }
        BackendKind::OpenAi => {
            let key = config.api_key.clone().ok_or_else(missing_key)?;
            Arc::new(ChatCompletionsBackend::openai(key, config.model.clone()))
        }
        BackendKind::OpenAiCompatible => {
            let url = config.base_url.clone().ok_or_else(|| {
                LlmError::Unavailable("openai_compatible backend needs llm.base_url".to_string())
            })?;
            Arc::new(ChatCompletionsBackend::compatible(url, config.model.clone(), config.api_key.clone()))
        }
        BackendKind::Ollama => Arc::new(ChatCompletionsBackend::ollama(
            config.base_url.clone(),
            config.model.clone(),
            config.api_key.clone(),
        )),
    };

    info!(
        backend = backend.backend_name(),
        model = backend.model_id(),
        is_local = backend.is_local(),
        "LLM backend ready"
    );
    Ok(backend)
}
