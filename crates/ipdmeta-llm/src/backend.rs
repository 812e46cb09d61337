//! Model backends behind the [`LlmBackend`] trait.
//!
//!   GeminiBackend          — Gemini `generateContent` (gemini-2.0-flash-lite, …)
//!   ChatCompletionsBackend — anything speaking the OpenAI chat-completions
//!                            protocol: api.openai.com, compatible servers
//!                            (LM Studio, vLLM, Groq, OpenRouter, …) and Ollama

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    /// Overrides the backend's configured model for this call.
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    /// Short provider name recorded in the audit trail.
    fn backend_name(&self) -> &str;
    fn is_local(&self) -> bool;
}

/// Map an HTTP reply to its JSON body or an [`LlmError`].
///
/// 429 is reported as [`LlmError::RateLimitExceeded`]; other 4xx/5xx replies
/// carry the provider's error message when one can be found in the body.
async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, LlmError> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimitExceeded);
    }
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(ErrorBody::message)
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).trim().to_string());
        return Err(LlmError::ApiError { status: status.as_u16(), message });
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Both `{"error": {"message": ..}}` and `{"message": ..}` shapes occur in the wild.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        self.error.and_then(|e| e.message).or(self.message)
    }
}

// ── Gemini ────────────────────────────────────────────────────────────────────

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiBackend {
    pub model: String,
    pub base_url: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: GeminiUsage,
    model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all parts concatenated.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Build Gemini `contents` from chat messages. System messages are dropped
/// (they travel as `systemInstruction`); consecutive messages with the same
/// role become parts of one turn, so prompt + document is a single user turn.
fn gemini_contents(messages: &[Message]) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = Vec::new();
    for m in messages {
        let role = match m.role {
            Role::System => continue,
            Role::User => "user",
            Role::Assistant => "model",
        };
        let part = GeminiPart { text: m.content.clone() };
        match contents.last_mut() {
            Some(last) if last.role.as_deref() == Some(role) => last.parts.push(part),
            _ => contents.push(GeminiContent { role: Some(role.to_string()), parts: vec![part] }),
        }
    }
    contents
}

fn gemini_request(req: &LlmRequest) -> GenerateContentRequest {
    let system: Vec<GeminiPart> = req
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| GeminiPart { text: m.content.clone() })
        .collect();

    GenerateContentRequest {
        contents: gemini_contents(&req.messages),
        system_instruction: (!system.is_empty()).then_some(GeminiContent { role: None, parts: system }),
        generation_config: GenerationConfig {
            temperature: req.temperature.unwrap_or(0.0),
            max_output_tokens: req.max_tokens,
        },
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = req.model.as_deref().unwrap_or(&self.model);
        let url = format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        );

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&gemini_request(&req))
            .send()
            .await?;
        let body: GenerateContentResponse = read_json(resp).await?;

        Ok(LlmResponse {
            content: body.text(),
            model: body.model_version.clone().unwrap_or_else(|| model.to_string()),
            prompt_tokens: body.usage_metadata.prompt_token_count,
            completion_tokens: body.usage_metadata.candidates_token_count,
        })
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &str { "gemini" }
    fn is_local(&self) -> bool { false }
}

// ── Chat completions (OpenAI protocol) ────────────────────────────────────────

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

pub struct ChatCompletionsBackend {
    pub base_url: String,
    pub model: String,
    provider: &'static str,
    local: bool,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl ChatCompletionsBackend {
    fn build(
        provider: &'static str,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
        local: bool,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            provider,
            local,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// api.openai.com.
    pub fn openai(api_key: SecretString, model: impl Into<String>) -> Self {
        Self::build("openai", OPENAI_BASE_URL, model, Some(api_key), false)
    }

    /// Any OpenAI-compatible server; the key is optional.
    pub fn compatible(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self::build("openai_compatible", base_url, model, api_key, false)
    }

    /// A local Ollama through its `/v1` endpoint. `None` means localhost.
    pub fn ollama(base_url: Option<String>, model: impl Into<String>, api_key: Option<SecretString>) -> Self {
        let base_url = base_url.unwrap_or_else(|| OLLAMA_BASE_URL.to_string());
        Self::build("ollama", base_url, model, api_key, true)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    model: Option<String>,
    #[serde(default)]
    usage: ChatUsage,
}

impl ChatResponse {
    fn into_response(self, fallback_model: &str) -> LlmResponse {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        LlmResponse {
            content,
            model: self.model.unwrap_or_else(|| fallback_model.to_string()),
            prompt_tokens: self.usage.prompt_tokens,
            completion_tokens: self.usage.completion_tokens,
        }
    }
}

fn chat_request<'a>(req: &'a LlmRequest, default_model: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model: req.model.as_deref().unwrap_or(default_model),
        messages: &req.messages,
        temperature: req.temperature.unwrap_or(0.0),
        max_tokens: req.max_tokens,
    }
}

#[async_trait]
impl LlmBackend for ChatCompletionsBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = chat_request(&req, &self.model);
        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        let reply: ChatResponse = read_json(builder.send().await?).await?;
        Ok(reply.into_response(body.model))
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &str { self.provider }
    fn is_local(&self) -> bool { self.local }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn key(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn request(messages: Vec<Message>) -> LlmRequest {
        LlmRequest { messages, model: None, max_tokens: None, temperature: None }
    }

    #[test]
    fn test_gemini_backend_identity() {
        let b = GeminiBackend::new(key("AIza-test"), "gemini-2.0-flash-lite");
        assert!(!b.is_local());
        assert_eq!(b.model_id(), "gemini-2.0-flash-lite");
        assert_eq!(b.backend_name(), "gemini");
        assert_eq!(b.base_url, GEMINI_BASE_URL);
    }

    #[test]
    fn test_chat_backends_identity() {
        let openai = ChatCompletionsBackend::openai(key("sk-test"), "gpt-4o");
        assert_eq!(openai.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert!(!openai.is_local());

        let compat = ChatCompletionsBackend::compatible("http://localhost:1234/", "local-model", None);
        assert_eq!(compat.backend_name(), "openai_compatible");
        assert_eq!(compat.endpoint(), "http://localhost:1234/v1/chat/completions");

        let ollama = ChatCompletionsBackend::ollama(None, "llama3:8b", None);
        assert!(ollama.is_local());
        assert_eq!(ollama.base_url, OLLAMA_BASE_URL);
    }

    #[test]
    fn test_gemini_request_merges_user_turns() {
        let req = request(vec![
            Message::system("sys"),
            Message::user("prompt"),
            Message::user("document"),
            Message { role: Role::Assistant, content: "ok".to_string() },
        ]);
        let body = serde_json::to_value(gemini_request(&req)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "prompt" }, { "text": "document" }] },
                    { "role": "model", "parts": [{ "text": "ok" }] }
                ],
                "systemInstruction": { "parts": [{ "text": "sys" }] },
                "generationConfig": { "temperature": 0.0 }
            })
        );
    }

    #[test]
    fn test_gemini_response_text_and_usage() {
        let body: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "[{" }, { "text": "}]" }] } }],
            "usageMetadata": { "promptTokenCount": 812, "candidatesTokenCount": 40 },
            "modelVersion": "gemini-2.0-flash-lite-001"
        }))
        .unwrap();
        assert_eq!(body.text(), "[{}]");
        assert_eq!(body.usage_metadata.prompt_token_count, 812);

        let blocked: GenerateContentResponse = serde_json::from_value(json!({ "candidates": [{}] })).unwrap();
        assert_eq!(blocked.text(), "");
    }

    #[test]
    fn test_chat_response_falls_back_to_request_model() {
        let reply: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": "[{}]" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        }))
        .unwrap();
        let resp = reply.into_response("fallback");
        assert_eq!(resp.content, "[{}]");
        assert_eq!(resp.model, "fallback");
        assert_eq!(resp.prompt_tokens, 12);
        assert_eq!(resp.completion_tokens, 3);
    }

    #[test]
    fn test_chat_request_defaults() {
        let req = request(vec![Message::user("hi")]);
        let body = serde_json::to_value(chat_request(&req, "gpt-4o-mini")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [{ "role": "user", "content": "hi" }],
                "temperature": 0.0
            })
        );
    }

    #[test]
    fn test_error_body_shapes() {
        let nested: ErrorBody = serde_json::from_value(json!({ "error": { "message": "bad key" } })).unwrap();
        assert_eq!(nested.message().as_deref(), Some("bad key"));
        let flat: ErrorBody = serde_json::from_value(json!({ "message": "model not found" })).unwrap();
        assert_eq!(flat.message().as_deref(), Some("model not found"));
    }
}
