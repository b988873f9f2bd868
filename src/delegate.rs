//! Boundary to the external rewriting service.

use crate::settings::ObfuscationSettings;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success status; carries the service's own message.
    #[error("invalid response")]
    InvalidResponse,
    #[error("empty response from rewriting service")]
    EmptyResponse,
    #[error("{0}")]
    Service(String),
}

/// One delegated transformation.
#[derive(Debug, Clone, Copy)]
pub struct DelegateRequest<'a> {
    pub code: &'a str,
    pub settings: &'a ObfuscationSettings,
    pub credential: &'a str,
}

/// A service that rewrites a whole snippet in one call.
#[async_trait]
pub trait DelegatedService: Send + Sync {
    /// Returns the raw response text; fence stripping and the empty check
    /// happen in the caller.
    async fn rewrite(&self, request: DelegateRequest<'_>) -> Result<String, DelegateError>;
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Natural-language instruction carrying every setting and the code.
pub fn build_prompt(code: &str, settings: &ObfuscationSettings) -> String {
    format!(
        "Obfuscate the following {language} code using these parameters:\n\
         - Intensity: {intensity}\n\
         - Rename Variables: {rename}\n\
         - String Encryption/Hiding: {strings}\n\
         - Control Flow Flattening: {flatten}\n\
         - Dead Code Injection: {dead}\n\
         - Target: {target}\n\
         - Exclusions (Do not rename these): {exclusions}\n\
         \n\
         Respond ONLY with the obfuscated code. Do not include markdown code blocks or explanations.\n\
         Code to obfuscate:\n\
         {code}\n",
        language = settings.language,
        intensity = settings.intensity.description(),
        rename = yes_no(settings.rename_variables),
        strings = yes_no(settings.string_encryption),
        flatten = yes_no(settings.control_flow_flattening),
        dead = yes_no(settings.dead_code_injection),
        target = settings.target_environment,
        exclusions = settings.exclusions,
    )
}

/// Removes a surrounding markdown code fence (with optional info string).
/// Text without a complete fence pair is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body_start) = after_open.find('\n') else {
        return trimmed;
    };
    let body = &after_open[body_start + 1..];
    match body.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim_end_matches(['\n', '\r']),
        None => trimmed,
    }
}

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str =
    "You are a source code obfuscation engine. You return only code that behaves exactly like the input.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// The message a failed call should surface: `error.message` (or a string
/// `error`) from a JSON body, else the raw body, else the status line.
fn service_error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        let error = value.get("error").unwrap_or(&value);
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_string)
    });
    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status.to_string(),
    }
}

/// OpenAI-compatible chat completions client.
pub struct ChatCompletionsDelegate {
    endpoint: String,
    model: String,
    client: Client,
}

impl ChatCompletionsDelegate {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, DelegateError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl DelegatedService for ChatCompletionsDelegate {
    async fn rewrite(&self, request: DelegateRequest<'_>) -> Result<String, DelegateError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                Message {
                    role: "user".into(),
                    content: build_prompt(request.code, request.settings),
                },
            ],
            temperature: 0.1,
            top_p: 1.0,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "sending delegated request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(request.credential)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(DelegateError::Service(service_error_message(status, &text)));
        }
        let response: ChatResponse = response.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(DelegateError::InvalidResponse)
    }
}
