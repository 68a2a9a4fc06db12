//! Actix Web HTTP server.
//!
//! Exposes OpenAI-compatible endpoints:
//! - `POST /v1/chat/completions`
//! - `GET /v1/models`
//! - `GET /` (debugging console)
//!
//! Failures detectable before any bytes reach the client become structured
//! error responses; once an SSE response is committed, failures surface
//! in-band (see the streaming module).

use crate::{
    config::{self, ProxyConfig},
    console, streaming, translation,
    types::{ChatCompletionRequest, ErrorBody, ModelList},
};
use actix_cors::Cors;
use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use chrono::Utc;
use futures::StreamExt;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
}

pub async fn serve(config: ProxyConfig) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.port);
    info!(addr = %addr, auth = config.auth_required(), "treegpt-proxy listening");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("failed to build reqwest client")?;

    let state = web::Data::new(AppState { config, client });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(routes)
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {}", addr))?
    .run()
    .await
    .context("server error")?;

    Ok(())
}

/// Route table, shared between `serve` and the test harness.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(console::page))
        .route("/v1/models", web::get().to(handle_models))
        .route("/v1/chat/completions", web::post().to(handle_chat_completions))
        .default_service(web::route().to(handle_not_found));
}

fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody::new(message, code))
}

/// Bearer-token check. With the default weak key configured, everything is
/// allowed through.
fn authorized(req: &HttpRequest, config: &ProxyConfig) -> bool {
    if !config.auth_required() {
        return true;
    }
    let expected = format!("Bearer {}", config.api_key);
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false)
}

async fn handle_models(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if !authorized(&req, &state.config) {
        return api_error(StatusCode::UNAUTHORIZED, "unauthorized", "Bearer token required");
    }
    HttpResponse::Ok().json(ModelList::new(&state.config.models, Utc::now().timestamp()))
}

async fn handle_chat_completions(
    state: web::Data<AppState>,
    req_http: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    if !authorized(&req_http, &state.config) {
        return api_error(StatusCode::UNAUTHORIZED, "unauthorized", "Bearer token required");
    }

    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                format!("invalid request body: {e}"),
            )
        }
    };

    let request_id = format!("req-{}", Uuid::new_v4());
    let model = state.config.resolve_model(req.model.as_deref());
    debug!(%request_id, model = %model, stream = req.wants_stream(), "chat completion accepted");

    let payload = translation::build_upstream_payload(&req.messages, &model);

    let upstream = match state
        .client
        .post(&state.config.upstream_url)
        .headers(config::impersonation_headers())
        .json(&payload)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, %request_id, "upstream request failed");
            return api_error(StatusCode::BAD_GATEWAY, "upstream_error", e.to_string());
        }
    };

    if !upstream.status().is_success() {
        let status = upstream.status();
        let text = upstream.text().await.unwrap_or_default();
        error!(%status, body = %text, %request_id, "upstream rejected request");
        return api_error(
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            "upstream_error",
            format!("upstream error ({status}): {text}"),
        );
    }

    if req.wants_stream() {
        let frames = streaming::handle_streaming(upstream, request_id.clone(), model)
            .map(|frame| Ok::<_, actix_web::Error>(web::Bytes::from(frame)));

        return HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("cache-control", "no-cache"))
            .insert_header(("x-request-id", request_id))
            .streaming(frames);
    }

    match translation::aggregate_response(upstream.bytes_stream(), &request_id, &model).await {
        Ok(completion) => HttpResponse::Ok().json(completion),
        Err(e) => {
            error!(error = %e, %request_id, "failed to read upstream response");
            api_error(StatusCode::BAD_GATEWAY, "upstream_error", e.to_string())
        }
    }
}

async fn handle_not_found(req: HttpRequest) -> HttpResponse {
    api_error(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("unknown path: {}", req.path()),
    )
}
