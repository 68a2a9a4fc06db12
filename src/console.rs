//! Embedded debugging console.
//!
//! A single static page served at `/`. It lists the configured models (via
//! `GET /v1/models`) and drives the SSE stream from the browser, so the
//! whole translation path can be exercised without an API client. The
//! handler only hands out bytes.

use actix_web::HttpResponse;

const PAGE: &str = include_str!("console.html");

pub async fn page() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(PAGE)
}
