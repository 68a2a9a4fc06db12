//! treegpt-proxy - OpenAI-compatible facade over the TreeGPT chat stream.
//!
//! OpenAI clients speak `/v1/chat/completions`. The upstream service streams
//! newline-delimited JSON instead. This crate exposes a compatible HTTP
//! surface and transcodes the upstream NDJSON body into OpenAI SSE chunks,
//! record by record, without ever buffering the full response.
//!
//! Design goals:
//! - Accept OpenAI-client traffic (chat completions wire format).
//! - Forward to the one fixed upstream endpoint with the headers it expects.
//! - Transcode incrementally under client backpressure; a disconnecting
//!   client releases the upstream connection.
//! - Best-effort translation: malformed upstream lines are dropped, and
//!   mid-stream failures surface in-band rather than as transport errors.

pub mod config;
pub mod console;
pub mod decode;
pub mod server;
pub mod streaming;
pub mod translation;
pub mod types;

pub use config::ProxyConfig;
pub use server::serve;
