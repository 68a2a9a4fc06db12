//! Streaming conversion (NDJSON -> SSE).
//!
//! Upstream streams bare JSON objects, one per line. OpenAI clients expect
//! Server-Sent Events with `data: {json}` frames and a terminal
//! `data: [DONE]` marker. This module reads the upstream body incrementally
//! and emits OpenAI SSE frames as raw strings.
//!
//! The stream is lazy and finite: frames are produced in upstream-arrival
//! order, one record at a time, and the whole response is never buffered.
//! Suspension happens at each upstream read and at each downstream write
//! (the Actix streaming body applies client backpressure). Dropping the
//! stream, which is what happens when the client disconnects, drops the
//! upstream response and releases the connection.

use crate::decode::RecordDecoder;
use crate::types::{ChatCompletionChunk, UpstreamRecord};
use async_stream::stream;
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tracing::{debug, error};

/// The literal frame that tells OpenAI clients the stream is over.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Convert an upstream NDJSON response into OpenAI SSE frames.
pub fn handle_streaming(
    response: reqwest::Response,
    request_id: String,
    model: String,
) -> impl Stream<Item = String> + Send {
    transcode_stream(response.bytes_stream(), request_id, model)
}

/// Core transcoding loop, generic over the byte source so tests can drive it
/// with synthetic chunk splits.
///
/// Yields fully formatted SSE frames:
///
/// ```text
/// data: {"id":"req-...","object":"chat.completion.chunk",...}
///
/// ```
///
/// After the upstream stream ends, one terminal chunk (`finish_reason:
/// "stop"`) is emitted, then [`DONE_FRAME`]. A read error mid-stream cannot
/// change the committed response status, so it surfaces as one in-band
/// error-annotated chunk instead, and the stream ends there.
pub fn transcode_stream<S, E>(
    mut upstream: S,
    request_id: String,
    model: String,
) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let created = Utc::now().timestamp();

    stream! {
        let mut decoder = RecordDecoder::new();
        let mut failed = false;

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    for record in decoder.feed(&bytes) {
                        for out in chunks_for_record(&record, &request_id, &model, created) {
                            yield sse_data(&out);
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, %request_id, "upstream stream failed mid-response");
                    yield sse_data(&ChatCompletionChunk::error(
                        &request_id,
                        &model,
                        created,
                        &e.to_string(),
                    ));
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            let discarded = decoder.finish();
            if discarded > 0 {
                debug!(bytes = discarded, %request_id, "discarding unterminated upstream tail");
            }
            yield sse_data(&ChatCompletionChunk::stop(&request_id, &model, created));
            yield DONE_FRAME.to_string();
        }
    }
}

/// Map one upstream record onto its OpenAI chunks.
///
/// Reasoning comes first: the thought precedes the speech it produced. Both
/// land in the plain `delta.content` channel, which every OpenAI client
/// understands. A record with neither field maps to nothing.
pub fn chunks_for_record(
    record: &UpstreamRecord,
    id: &str,
    model: &str,
    created: i64,
) -> Vec<ChatCompletionChunk> {
    let mut chunks = Vec::with_capacity(2);
    if let Some(reasoning) = record.reasoning_text() {
        chunks.push(ChatCompletionChunk::content(id, model, created, reasoning));
    }
    if let Some(content) = record.content_text() {
        chunks.push(ChatCompletionChunk::content(id, model, created, content));
    }
    chunks
}

fn sse_data(chunk: &ChatCompletionChunk) -> String {
    let json = serde_json::to_string(chunk).expect("serialize chunk");
    format!("data: {json}\n\n")
}
