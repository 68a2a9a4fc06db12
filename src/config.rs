//! Configuration from environment variables.
//!
//! There is one upstream and one static model list; everything is read once
//! at startup and immutable afterwards.
//!
//! **Environment variables:**
//! - `PORT`: server port (default: 8787)
//! - `API_MASTER_KEY`: bearer key clients must present (default: "1", which
//!   leaves the proxy open for local testing)
//! - `UPSTREAM_API_URL`: upstream chat endpoint (default: the TreeGPT stream
//!   endpoint)
//! - `REQUEST_TIMEOUT_SECS`: upstream request timeout (default: 120)

use reqwest::header::{HeaderMap, HeaderValue};
use std::env;

/// The bearer key value that disables auth enforcement. Kept for parity with
/// the worker deployment this proxy replaces.
pub const OPEN_ACCESS_KEY: &str = "1";

pub const DEFAULT_UPSTREAM_URL: &str = "https://treegpt.app/api/chat-stream";

/// Models the upstream service accepts (taken from its own web client).
pub const MODELS: &[&str] = &[
    "qwen-3-32b",
    "deepseek-reasoner",
    "deepseek-chat",
    "llama-3.3-70b",
    "llama-3.1-8b",
    "llama-4-scout-17b-16e-instruct",
];

pub const DEFAULT_MODEL: &str = "qwen-3-32b";

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    pub api_key: String,
    pub upstream_url: String,
    pub request_timeout_secs: u64,
    pub models: Vec<String>,
    pub default_model: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8787),
            api_key: env::var("API_MASTER_KEY").unwrap_or_else(|_| OPEN_ACCESS_KEY.to_string()),
            upstream_url: env::var("UPSTREAM_API_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(120),
            models: MODELS.iter().map(|m| m.to_string()).collect(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ProxyConfig {
    /// Whether bearer auth is enforced. The default weak key leaves the
    /// proxy open.
    pub fn auth_required(&self) -> bool {
        self.api_key != OPEN_ACCESS_KEY
    }

    /// The model to forward upstream: the client's choice, or the default
    /// when the request names none (or an empty string).
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        requested
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string()
    }
}

/// Browser-impersonation headers for the upstream request.
///
/// Upstream serves its own web client and expects requests that look like
/// it; the set below is reproduced from a captured Chrome 142 session and
/// must not be trimmed.
pub fn impersonation_headers() -> HeaderMap {
    const HEADERS: &[(&str, &str)] = &[
        ("host", "treegpt.app"),
        ("origin", "https://treegpt.app"),
        ("referer", "https://treegpt.app/"),
        (
            "user-agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36",
        ),
        ("content-type", "application/json"),
        ("accept", "*/*"),
        ("accept-language", "zh-CN,zh;q=0.9,en;q=0.8"),
        (
            "sec-ch-ua",
            "\"Chromium\";v=\"142\", \"Google Chrome\";v=\"142\", \"Not_A Brand\";v=\"99\"",
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"Windows\""),
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "same-origin"),
        ("priority", "u=1, i"),
    ];

    let mut map = HeaderMap::with_capacity(HEADERS.len());
    for (name, value) in HEADERS {
        map.insert(*name, HeaderValue::from_static(value));
    }
    map
}
