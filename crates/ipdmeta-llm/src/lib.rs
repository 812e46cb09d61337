//! ipdmeta-llm — Stage 3: LLM feature extraction.
//! - `LlmBackend` trait with Gemini and chat-completions (OpenAI, compatible, Ollama) backends
//! - Backend selection from configuration
//! - Response cleaning and JSON → `PatientRecord` mapping
//! - Sequential batch extraction with an audit trail

pub mod backend;
pub mod router;
pub mod audit;
pub mod prompt;
pub mod response;
pub mod extractor;

pub use backend::{ChatCompletionsBackend, GeminiBackend, LlmBackend, LlmError, LlmRequest, LlmResponse, Message, Role};
pub use extractor::{BatchOutcome, ExtractorConfig, FailurePolicy, FeatureExtractor, StudyFailure};
pub use response::{parse_case_report, parse_case_series, strip_code_fence, ExtractionError};
pub use router::{build_backend, BackendConfig, BackendKind};
