use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use treegpt_proxy::config::{self, ProxyConfig};
use treegpt_proxy::server::{self, AppState};

#[::core::prelude::v1::test]
fn proxy_config_defaults() {
    let config = ProxyConfig::default();
    assert_eq!(config.default_model, "qwen-3-32b");
    assert_eq!(config.models.len(), 6);
    assert!(config.models.iter().any(|m| m == "deepseek-reasoner"));
}

fn test_state(api_key: &str, upstream_url: &str) -> web::Data<AppState> {
    web::Data::new(AppState {
        config: ProxyConfig {
            port: 0,
            api_key: api_key.to_string(),
            upstream_url: upstream_url.to_string(),
            request_timeout_secs: 5,
            models: config::MODELS.iter().map(|m| m.to_string()).collect(),
            default_model: config::DEFAULT_MODEL.to_string(),
        },
        client: reqwest::Client::new(),
    })
}

/// One-shot upstream: accepts a single connection, consumes the request, and
/// answers with the given NDJSON body.
async fn spawn_upstream(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();

        let mut req = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = sock.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            req.extend_from_slice(&buf[..n]);
            if let Some(header_end) = req.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&req[..header_end]).to_ascii_lowercase();
                let content_length: usize = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0);
                if req.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let resp = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        sock.write_all(resp.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
    });

    format!("http://{addr}")
}

fn sse_contents(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|l| l.strip_prefix("data: "))
        .filter(|d| *d != "[DONE]")
        .filter_map(|d| serde_json::from_str::<Value>(d).ok())
        .filter_map(|v| {
            v["choices"][0]["delta"]["content"]
                .as_str()
                .map(|s| s.to_string())
        })
        .collect()
}

#[actix_web::test]
async fn rejects_bad_bearer_before_contacting_upstream() {
    // Port 1 refuses connections instantly: reaching upstream would show up
    // as a 502, not a 401.
    let state = test_state("secret", "http://127.0.0.1:1/");
    let app =
        test::init_service(App::new().app_data(state).configure(server::routes)).await;

    for auth in [None, Some("Bearer wrong"), Some("secret")] {
        let mut req = test::TestRequest::post()
            .uri("/v1/chat/completions")
            .set_json(json!({"messages": [{"role": "user", "content": "hi"}]}));
        if let Some(header) = auth {
            req = req.insert_header(("authorization", header));
        }
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "auth: {auth:?}");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "unauthorized");
        assert_eq!(body["error"]["type"], "api_error");
    }
}

#[actix_web::test]
async fn correct_bearer_reaches_upstream() {
    let state = test_state("secret", "http://127.0.0.1:1/");
    let app =
        test::init_service(App::new().app_data(state).configure(server::routes)).await;

    let req = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .insert_header(("authorization", "Bearer secret"))
        .set_json(json!({"messages": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // The refused upstream connection proves the guard let this one through.
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "upstream_error");
}

#[actix_web::test]
async fn models_listing_has_openai_shape() {
    let state = test_state("1", "http://127.0.0.1:1/");
    let app =
        test::init_service(App::new().app_data(state).configure(server::routes)).await;

    let req = test::TestRequest::get().uri("/v1/models").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["object"], "list");
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 6);
    assert_eq!(data[0]["object"], "model");
    assert_eq!(data[0]["owned_by"], "treegpt");
}

#[actix_web::test]
async fn unknown_path_returns_structured_404() {
    let state = test_state("1", "http://127.0.0.1:1/");
    let app =
        test::init_service(App::new().app_data(state).configure(server::routes)).await;

    let req = test::TestRequest::get().uri("/v1/embeddings").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "not_found");
}

#[actix_web::test]
async fn malformed_body_returns_structured_400() {
    let state = test_state("1", "http://127.0.0.1:1/");
    let app =
        test::init_service(App::new().app_data(state).configure(server::routes)).await;

    let req = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "invalid_request_error");
}

#[actix_web::test]
async fn streams_upstream_records_as_sse_in_order() {
    let upstream = spawn_upstream(
        "{\"reasoning\":\"Let me think.\"}\n{\"content\":\"Hello\"}\n{\"content\":\" world\"}\n",
    )
    .await;
    let state = test_state("1", &upstream);
    let app =
        test::init_service(App::new().app_data(state).configure(server::routes)).await;

    let req = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(json!({
            "model": "deepseek-chat",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert_eq!(sse_contents(&body), ["Let me think.", "Hello", " world"]);

    let frames: Vec<&str> = body
        .lines()
        .filter_map(|l| l.strip_prefix("data: "))
        .collect();
    assert_eq!(frames.last(), Some(&"[DONE]"));

    let stop: Value = serde_json::from_str(frames[frames.len() - 2]).unwrap();
    assert_eq!(stop["choices"][0]["finish_reason"], "stop");
    assert_eq!(stop["choices"][0]["delta"], json!({}));
    assert_eq!(stop["model"], "deepseek-chat");
}

#[actix_web::test]
async fn non_streaming_mode_aggregates_the_whole_response() {
    let upstream = spawn_upstream(
        "{\"reasoning\":\"A\"}\n{\"content\":\"B\"}\nnot json\n{\"content\":\"C\"}\n",
    )
    .await;
    let state = test_state("1", &upstream);
    let app =
        test::init_service(App::new().app_data(state).configure(server::routes)).await;

    let req = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "qwen-3-32b");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "ABC");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
}
