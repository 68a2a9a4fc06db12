//! Upstream request construction and the non-streaming aggregation path.
//!
//! The outbound payload is deliberately minimal: the client's `messages`
//! array passes through verbatim and only the model selection is added.

use crate::decode::RecordDecoder;
use crate::types::ChatCompletion;
use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};

/// Build the upstream chat payload.
///
/// `autoRouteEnabled` is forced off: with routing on, upstream picks its own
/// model and the requested one is ignored.
pub fn build_upstream_payload(messages: &[Value], model: &str) -> Value {
    json!({
        "messages": messages,
        "model": model,
        "autoRouteEnabled": false,
    })
}

/// Non-streaming mode: drain the whole upstream body and aggregate every
/// record's reasoning-then-content text, in arrival order, into one
/// completed assistant message.
///
/// The full response text is held in memory with no size cap; callers that
/// cannot afford that should request streaming instead.
pub async fn aggregate_response<S, E>(
    mut upstream: S,
    request_id: &str,
    model: &str,
) -> Result<ChatCompletion>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut decoder = RecordDecoder::new();
    let mut full = String::new();

    while let Some(chunk) = upstream.next().await {
        let bytes = chunk.context("failed to read upstream response body")?;
        for record in decoder.feed(&bytes) {
            if let Some(reasoning) = record.reasoning_text() {
                full.push_str(reasoning);
            }
            if let Some(content) = record.content_text() {
                full.push_str(content);
            }
        }
    }
    decoder.finish();

    Ok(ChatCompletion::assistant(
        request_id,
        model,
        Utc::now().timestamp(),
        full,
    ))
}
