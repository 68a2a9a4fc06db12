//! Wire types for both sides of the translation.
//!
//! Clients speak (a subset of) OpenAI's `/v1/chat/completions` API. The
//! upstream service answers with newline-delimited JSON objects instead.
//! This file declares the client-facing OpenAI shapes and the upstream
//! record shape.
//!
//! Notes:
//! - `messages` passes through verbatim as raw JSON values; the proxy never
//!   inspects message content.
//! - Upstream records carry extra fields (model info, usage hints) that are
//!   ignored on deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One parsed line of the upstream NDJSON body.
///
/// Only the two text channels matter; an absent field and an empty string
/// mean the same thing (nothing to emit).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpstreamRecord {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl UpstreamRecord {
    /// The reasoning fragment, if there is anything to emit.
    pub fn reasoning_text(&self) -> Option<&str> {
        self.reasoning.as_deref().filter(|s| !s.is_empty())
    }

    /// The content fragment, if there is anything to emit.
    pub fn content_text(&self) -> Option<&str> {
        self.content.as_deref().filter(|s| !s.is_empty())
    }
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<Value>,
    #[serde(default)]
    pub stream: Option<bool>,
}

impl ChatCompletionRequest {
    /// Streaming is opt-out: anything but an explicit `false` streams.
    pub fn wants_stream(&self) -> bool {
        self.stream != Some(false)
    }
}

/// Streaming delta. Serializes to `{}` when there is no text, which is what
/// the terminal chunk carries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    /// `null` while streaming, `"stop"` on the terminal chunk.
    pub finish_reason: Option<String>,
}

/// One OpenAI-compatible streaming frame (`object: "chat.completion.chunk"`).
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    fn build(
        id: &str,
        model: &str,
        created: i64,
        delta: Delta,
        finish_reason: Option<String>,
    ) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }

    /// A text delta chunk.
    pub fn content(id: &str, model: &str, created: i64, text: impl Into<String>) -> Self {
        Self::build(
            id,
            model,
            created,
            Delta {
                content: Some(text.into()),
            },
            None,
        )
    }

    /// The terminal chunk: empty delta, `finish_reason: "stop"`.
    pub fn stop(id: &str, model: &str, created: i64) -> Self {
        Self::build(id, model, created, Delta::default(), Some("stop".to_string()))
    }

    /// Best-effort in-band error annotation for failures after the response
    /// headers are already committed.
    pub fn error(id: &str, model: &str, created: i64, message: &str) -> Self {
        Self::build(
            id,
            model,
            created,
            Delta {
                content: Some(format!("\n\n[Error: {message}]")),
            },
            Some("stop".to_string()),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: String,
}

/// Token usage info. Upstream reports none, so the counts stay zeroed.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Non-streaming response body (`object: "chat.completion"`).
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: Usage,
}

impl ChatCompletion {
    /// A completed assistant turn carrying the whole aggregated text.
    pub fn assistant(id: &str, model: &str, created: i64, content: String) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion".to_string(),
            created,
            model: model.to_string(),
            choices: vec![CompletionChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant".to_string(),
                    content,
                },
                finish_reason: "stop".to_string(),
            }],
            usage: Usage::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// Response body for `GET /v1/models`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelList {
    pub fn new(ids: &[String], created: i64) -> Self {
        Self {
            object: "list".to_string(),
            data: ids
                .iter()
                .map(|id| ModelInfo {
                    id: id.clone(),
                    object: "model".to_string(),
                    created,
                    owned_by: "treegpt".to_string(),
                })
                .collect(),
        }
    }
}

/// Error response shape for every failure reported before streaming starts.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>, code: &str) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                kind: "api_error".to_string(),
                code: code.to_string(),
            },
        }
    }
}
