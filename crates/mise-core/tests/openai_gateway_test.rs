//! Tests for the OpenAI-compatible gateway against a local stand-in server.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use mise_core::gateway::{CompletionGateway, GatewayError, OpenAiGateway};

#[derive(Clone, Default)]
struct Captured {
    body: Arc<Mutex<Option<Value>>>,
    auth: Arc<Mutex<Option<String>>>,
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn gateway(addr: SocketAddr, timeout: Duration) -> OpenAiGateway {
    OpenAiGateway::new(&format!("http://{addr}/v1/"), "sk-test", "gpt-4", timeout).unwrap()
}

#[tokio::test]
async fn returns_first_choice_verbatim() {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    *captured.body.lock().unwrap() = Some(body);
                    *captured.auth.lock().unwrap() = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    Json(json!({
                        "choices": [{"message": {"role": "assistant", "content": "```json\n{\"meals\": []}\n```"}}]
                    }))
                },
            ),
        )
        .with_state(captured.clone());
    let addr = serve(router).await;

    let text = gateway(addr, Duration::from_secs(5))
        .generate("plan my week")
        .await
        .expect("request should succeed");
    assert_eq!(text, "```json\n{\"meals\": []}\n```");

    let body = captured.body.lock().unwrap().clone().expect("body captured");
    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "plan my week");
    assert_eq!(
        captured.auth.lock().unwrap().as_deref(),
        Some("Bearer sk-test")
    );
}

#[tokio::test]
async fn error_status_carries_api_message() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"message": "invalid api key"}})),
            )
        }),
    );
    let addr = serve(router).await;

    let err = gateway(addr, Duration::from_secs(5))
        .generate("hi")
        .await
        .unwrap_err();
    match err {
        GatewayError::BadStatus { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid api key");
        }
        other => panic!("expected BadStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn response_without_text_is_invalid() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let addr = serve(router).await;

    let err = gateway(addr, Duration::from_secs(5))
        .generate("hi")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidResponse(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"choices": []}))
        }),
    );
    let addr = serve(router).await;

    let err = gateway(addr, Duration::from_millis(100))
        .generate("hi")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(addr, Duration::from_secs(5))
        .generate("hi")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unreachable(_)), "got {err:?}");
}
