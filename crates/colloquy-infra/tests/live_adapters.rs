//! Adapter integration tests against in-process mock servers.
//!
//! Each test stands up a small axum server on an ephemeral port and
//! drives a real adapter through the factory, covering wire layout,
//! auth headers, error mapping, and the remap retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use colloquy_core::llm::adapter::{AdapterFactory, PromptRequest};
use colloquy_infra::llm::factory::HttpAdapterFactory;
use colloquy_types::chat::ChatMessage;
use colloquy_types::error::AdapterError;
use colloquy_types::model::{GenerationParams, ModelDescriptor, ProviderSpec};

/// Bind an ephemeral port, serve the router, and return the base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn descriptor(name: &str, endpoint: &str, provider: ProviderSpec) -> ModelDescriptor {
    ModelDescriptor {
        name: name.to_string(),
        description: None,
        endpoint: Some(endpoint.to_string()),
        api_key: Some(SecretString::from("sk-test")),
        model_id: format!("{name}-1"),
        params: GenerationParams::default(),
        response_path: None,
        provider,
    }
}

fn request() -> PromptRequest {
    PromptRequest {
        system: "You are terse.".to_string(),
        messages: vec![ChatMessage::user("hello")],
    }
}

#[tokio::test]
async fn chat_completion_happy_path() {
    let captured: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::default();
    let router = Router::new().route(
        "/v1/chat/completions",
        post({
            let captured = Arc::clone(&captured);
            move |headers: HeaderMap, Json(body): Json<Value>| async move {
                *captured.lock().await = Some((headers, body));
                Json(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "hi there" } }]
                }))
            }
        }),
    );
    let base = serve(router).await;

    let adapter = HttpAdapterFactory::new()
        .build(&descriptor("gpt", &base, ProviderSpec::ChatCompletion))
        .unwrap();
    let reply = adapter.call(&request()).await.unwrap();
    assert_eq!(reply, "hi there");

    let (headers, body) = captured.lock().await.take().unwrap();
    assert_eq!(headers["authorization"], "Bearer sk-test");
    assert_eq!(body["model"], "gpt-1");
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], "You are terse.");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "hello");
}

#[tokio::test]
async fn messages_dialect_sends_system_top_level() {
    let captured: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::default();
    let router = Router::new().route(
        "/v1/messages",
        post({
            let captured = Arc::clone(&captured);
            move |headers: HeaderMap, Json(body): Json<Value>| async move {
                *captured.lock().await = Some((headers, body));
                Json(json!({
                    "content": [{ "type": "text", "text": "claude says hi" }]
                }))
            }
        }),
    );
    let base = serve(router).await;

    let adapter = HttpAdapterFactory::new()
        .build(&descriptor("claude", &base, ProviderSpec::Messages))
        .unwrap();
    let reply = adapter.call(&request()).await.unwrap();
    assert_eq!(reply, "claude says hi");

    let (headers, body) = captured.lock().await.take().unwrap();
    assert_eq!(headers["x-api-key"], "sk-test");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(body["system"], "You are terse.");
    // History carries no system role in this dialect.
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
}

#[tokio::test]
async fn remap_retries_once_with_fallback_id() {
    #[derive(Default)]
    struct Hits {
        calls: AtomicUsize,
        models: Mutex<Vec<String>>,
    }
    let hits = Arc::new(Hits::default());

    let router = Router::new().route(
        "/v1/chat/completions",
        post({
            let hits = Arc::clone(&hits);
            move |Json(body): Json<Value>| async move {
                hits.calls.fetch_add(1, Ordering::SeqCst);
                let model = body["model"].as_str().unwrap_or_default().to_string();
                hits.models.lock().await.push(model.clone());
                if model == "general" {
                    Json(json!({
                        "choices": [{ "message": { "content": "fallback reply" } }]
                    }))
                    .into_response()
                } else {
                    (
                        axum::http::StatusCode::BAD_REQUEST,
                        Json(json!({ "error": { "message": format!("model '{model}' not found") } })),
                    )
                        .into_response()
                }
            }
        }),
    );
    let base = serve(router).await;

    let provider = ProviderSpec::RemapFallback {
        model_map: HashMap::from([("spark-1".to_string(), "generalv3.5".to_string())]),
        fallback_model_id: "general".to_string(),
        persona_as_user: false,
    };
    let adapter = HttpAdapterFactory::new()
        .build(&descriptor("spark", &base, provider))
        .unwrap();

    let reply = adapter.call(&request()).await.unwrap();
    assert_eq!(reply, "fallback reply");
    assert_eq!(hits.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        *hits.models.lock().await,
        vec!["generalv3.5".to_string(), "general".to_string()]
    );
}

#[tokio::test]
async fn remap_does_not_retry_other_errors() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new().route(
        "/v1/chat/completions",
        post({
            let calls = Arc::clone(&calls);
            move |Json(_): Json<Value>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                (
                    axum::http::StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": { "message": "slow down" } })),
                )
            }
        }),
    );
    let base = serve(router).await;

    let provider = ProviderSpec::RemapFallback {
        model_map: HashMap::new(),
        fallback_model_id: "general".to_string(),
        persona_as_user: false,
    };
    let adapter = HttpAdapterFactory::new()
        .build(&descriptor("spark", &base, provider))
        .unwrap();

    let err = adapter.call(&request()).await.unwrap_err();
    // Mapped id equals the fallback here, so no retry is possible.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match err {
        AdapterError::Provider { status, message } => {
            assert_eq!(status, Some(429));
            assert_eq!(message, "the provider is rate limiting requests");
        }
        other => panic!("wrong variant: {other}"),
    }
}

#[tokio::test]
async fn template_substitutes_key_and_follows_response_path() {
    let captured: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::default();
    let router = Router::new().route(
        "/api/chat",
        post({
            let captured = Arc::clone(&captured);
            move |headers: HeaderMap, Json(body): Json<Value>| async move {
                *captured.lock().await = Some((headers, body));
                Json(json!({ "data": [{ "text": "templated reply" }] }))
            }
        }),
    );
    let base = serve(router).await;

    let mut descriptor = descriptor(
        "custom",
        &format!("{base}/api/chat"),
        ProviderSpec::Template {
            body: json!({ "model": "custom-1", "stream": false }),
            headers: HashMap::from([(
                "x-auth".to_string(),
                "token {api_key}".to_string(),
            )]),
        },
    );
    descriptor.response_path = Some("data.0.text".to_string());

    let adapter = HttpAdapterFactory::new().build(&descriptor).unwrap();
    let reply = adapter.call(&request()).await.unwrap();
    assert_eq!(reply, "templated reply");

    let (headers, body) = captured.lock().await.take().unwrap();
    assert_eq!(headers["x-auth"], "token sk-test");
    assert_eq!(body["stream"], false);
    assert!(body["messages"].is_array());
}

#[tokio::test]
async fn local_server_accepts_generation_shape() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({ "response": "local reply" })) }),
    );
    let base = serve(router).await;

    let mut descriptor = descriptor("llama", &base, ProviderSpec::LocalServer);
    descriptor.api_key = None;

    let adapter = HttpAdapterFactory::new().build(&descriptor).unwrap();
    let reply = adapter.call(&request()).await.unwrap();
    assert_eq!(reply, "local reply");
}

#[tokio::test]
async fn non_success_status_maps_to_provider_error() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": { "message": "upstream exploded" } })),
            )
        }),
    );
    let base = serve(router).await;

    let adapter = HttpAdapterFactory::new()
        .build(&descriptor("gpt", &base, ProviderSpec::ChatCompletion))
        .unwrap();
    let err = adapter.call(&request()).await.unwrap_err();
    match err {
        AdapterError::Provider { status, message } => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("wrong variant: {other}"),
    }
}

#[tokio::test]
async fn connection_refused_maps_to_transport_error() {
    // Bind then drop so the port is known dead.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let adapter = HttpAdapterFactory::new()
        .build(&descriptor("gpt", &base, ProviderSpec::ChatCompletion))
        .unwrap();
    let err = adapter.call(&request()).await.unwrap_err();
    assert!(matches!(err, AdapterError::Transport(_)));
    assert_eq!(
        err.user_message(),
        "The AI service is currently unavailable. Please try again later."
    );
}

#[tokio::test]
async fn provider_error_body_on_success_status_is_surfaced() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({ "error": { "message": "quota exceeded", "type": "billing" } })) }),
    );
    let base = serve(router).await;

    let adapter = HttpAdapterFactory::new()
        .build(&descriptor("gpt", &base, ProviderSpec::ChatCompletion))
        .unwrap();
    let err = adapter.call(&request()).await.unwrap_err();
    match err {
        AdapterError::Provider { status, message } => {
            assert_eq!(status, None);
            assert_eq!(message, "quota exceeded (billing)");
        }
        other => panic!("wrong variant: {other}"),
    }
}
