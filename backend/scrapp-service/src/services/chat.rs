//! Disposal chat: forwards a user question plus classification context to
//! Google's Generative Language API and relays the text reply.
use crate::config::ChatConfig;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Only the most recent turns are forwarded upstream.
pub const MAX_HISTORY_TURNS: usize = 10;

pub const SYSTEM_GUIDE: &str = "You are a recycling and waste-disposal assistant. \
     Be concise, actionable, and accurate. \
     Always note that local rules vary and users should check their municipality\u{2019}s website. \
     When unsure, ask a clarifying question (e.g., type numbers on plastic, contamination, etc.).";

const NO_CONTEXT: &str = "No prior classification context.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("prompt was blocked: {0}")]
    Blocked(String),

    #[error("response contained no text")]
    EmptyReply,
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One prior turn as sent upstream
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// Chat-completion backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Continue `history` with `prompt` as the next user turn and return the reply text
    async fn generate(&self, history: Vec<ChatMessage>, prompt: String) -> Result<String, ChatError>;
}

/// Body of `POST /api/disposal-chat/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisposalChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub history: Option<Vec<HistoryTurn>>,
}

/// Conversation turn as the client sends it
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryTurn {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Map the client's history to upstream turns, keeping the last [`MAX_HISTORY_TURNS`].
///
/// `"user"` stays user; any other role becomes the model.
pub fn recent_history(turns: &[HistoryTurn]) -> Vec<ChatMessage> {
    let start = turns.len().saturating_sub(MAX_HISTORY_TURNS);
    turns[start..]
        .iter()
        .map(|turn| ChatMessage {
            role: if turn.role.as_deref() == Some("user") {
                ChatRole::User
            } else {
                ChatRole::Model
            },
            text: turn.content.clone().unwrap_or_default(),
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Compose the system guide, classification context and user message.
pub fn build_prompt(
    label: Option<&str>,
    instructions: Option<&str>,
    message: &str,
    now: DateTime<Utc>,
) -> String {
    let mut context_bits = Vec::new();
    if let Some(label) = non_empty(label) {
        context_bits.push(format!("Predicted category: {}", label));
    }
    if let Some(instructions) = non_empty(instructions) {
        context_bits.push(format!("Recommended steps: {}", instructions));
    }
    let context = if context_bits.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        context_bits.join("\n")
    };

    format!(
        "{}\n\nContext:\n{}\n\nUser message at {}:\n{}",
        SYSTEM_GUIDE,
        context,
        now.to_rfc3339_opts(SecondsFormat::Micros, false),
        message
    )
}

/// Validates chat requests and relays them to the provider
pub struct DisposalChatService {
    provider: Arc<dyn ChatProvider>,
}

impl DisposalChatService {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Single upstream attempt; an empty message never reaches the provider.
    pub async fn reply(
        &self,
        request: DisposalChatRequest,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let message = request.message.as_deref().unwrap_or_default().trim();
        if message.is_empty() {
            return Err(AppError::BadRequest(
                "Field 'message' is required.".to_string(),
            ));
        }

        let history = recent_history(request.history.as_deref().unwrap_or_default());
        let prompt = build_prompt(
            request.label.as_deref(),
            request.instructions.as_deref(),
            message,
            now,
        );

        debug!(
            history_turns = history.len(),
            has_label = non_empty(request.label.as_deref()).is_some(),
            "Forwarding disposal chat"
        );

        let reply = self.provider.generate(history, prompt).await?;
        Ok(reply.trim().to_string())
    }
}

// ============================================
// Gemini REST client
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl Content {
    fn text(role: ChatRole, text: String) -> Self {
        let role = match role {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![Part { text: Some(text) }],
        }
    }
}

/// Build the upstream request body: history followed by the new user prompt
fn build_request(history: Vec<ChatMessage>, prompt: String) -> GenerateContentRequest {
    let mut contents: Vec<Content> = history
        .into_iter()
        .map(|m| Content::text(m.role, m.text))
        .collect();
    contents.push(Content::text(ChatRole::User, prompt));
    GenerateContentRequest { contents }
}

/// Concatenate the text parts of the first candidate
fn extract_reply(response: GenerateContentResponse) -> Result<String, ChatError> {
    let candidate = match response.candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => {
            return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => ChatError::Blocked(reason),
                None => ChatError::EmptyReply,
            })
        }
    };

    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if texts.is_empty() {
        return Err(match candidate.finish_reason {
            Some(reason) if reason != "STOP" => ChatError::Blocked(reason),
            _ => ChatError::EmptyReply,
        });
    }

    Ok(texts.concat())
}

/// Google Generative Language API client
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn generate(&self, history: Vec<ChatMessage>, prompt: String) -> Result<String, ChatError> {
        let request = build_request(history, prompt);
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(status = %status, error = %message, "Gemini request failed");
            return Err(ChatError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ChatError::InvalidResponse(e.to_string()))?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Gemini response received"
        );

        extract_reply(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockall::predicate::*;

    fn turns(n: usize) -> Vec<HistoryTurn> {
        (0..n)
            .map(|i| HistoryTurn {
                role: Some(if i % 2 == 0 { "user" } else { "assistant" }.to_string()),
                content: Some(format!("turn {}", i)),
            })
            .collect()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_history_truncated_to_last_ten() {
        let history = recent_history(&turns(14));
        assert_eq!(history.len(), MAX_HISTORY_TURNS);
        assert_eq!(history[0].text, "turn 4");
        assert_eq!(history[9].text, "turn 13");
    }

    #[test]
    fn test_history_roles_and_missing_content() {
        let history = recent_history(&[
            HistoryTurn {
                role: Some("user".into()),
                content: Some("hi".into()),
            },
            HistoryTurn {
                role: Some("assistant".into()),
                content: None,
            },
            HistoryTurn::default(),
        ]);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].role, ChatRole::Model);
        assert_eq!(history[1].text, "");
        assert_eq!(history[2].role, ChatRole::Model);
    }

    #[test]
    fn test_prompt_with_context() {
        let prompt = build_prompt(Some("glass"), Some("Rinse it."), "Can I recycle a mirror?", fixed_now());
        assert!(prompt.starts_with(SYSTEM_GUIDE));
        assert!(prompt.contains("Context:\nPredicted category: glass\nRecommended steps: Rinse it.\n\n"));
        assert!(prompt.ends_with("User message at 2025-03-01T12:00:00.000000+00:00:\nCan I recycle a mirror?"));
    }

    #[test]
    fn test_prompt_without_context() {
        let prompt = build_prompt(None, Some(""), "hello", fixed_now());
        assert!(prompt.contains("Context:\nNo prior classification context.\n\n"));
    }

    #[test]
    fn test_extract_reply_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Rinse "}, {"text": "and recycle."}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_reply(response).unwrap(), "Rinse and recycle.");
    }

    #[test]
    fn test_extract_reply_blocked_prompt() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(matches!(extract_reply(response), Err(ChatError::Blocked(r)) if r == "SAFETY"));

        let empty = GenerateContentResponse::default();
        assert!(matches!(extract_reply(empty), Err(ChatError::EmptyReply)));
    }

    #[test]
    fn test_request_body_shape() {
        let body = build_request(
            vec![ChatMessage {
                role: ChatRole::Model,
                text: "earlier".into(),
            }],
            "now".into(),
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [
                    {"role": "model", "parts": [{"text": "earlier"}]},
                    {"role": "user", "parts": [{"text": "now"}]}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_blank_message_never_calls_provider() {
        let mut provider = MockChatProvider::new();
        provider.expect_generate().times(0);
        let service = DisposalChatService::new(Arc::new(provider));

        let err = service
            .reply(
                DisposalChatRequest {
                    message: Some("   \n".into()),
                    ..Default::default()
                },
                fixed_now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m == "Field 'message' is required."));
    }

    #[tokio::test]
    async fn test_reply_is_trimmed_and_history_forwarded() {
        let mut provider = MockChatProvider::new();
        provider
            .expect_generate()
            .withf(|history, prompt| history.len() == 10 && prompt.ends_with("\nWhat about lids?"))
            .times(1)
            .returning(|_, _| Ok("  Remove the lid first.\n".to_string()));
        let service = DisposalChatService::new(Arc::new(provider));

        let reply = service
            .reply(
                DisposalChatRequest {
                    message: Some("  What about lids?  ".into()),
                    history: Some(turns(12)),
                    ..Default::default()
                },
                fixed_now(),
            )
            .await
            .unwrap();
        assert_eq!(reply, "Remove the lid first.");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_surfaced() {
        let mut provider = MockChatProvider::new();
        provider
            .expect_generate()
            .with(always(), always())
            .returning(|_, _| Err(ChatError::Transport("connection refused".into())));
        let service = DisposalChatService::new(Arc::new(provider));

        let err = service
            .reply(
                DisposalChatRequest {
                    message: Some("hi".into()),
                    ..Default::default()
                },
                fixed_now(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gemini call failed: request failed: connection refused"
        );
    }
}
