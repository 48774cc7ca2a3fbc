//! ---
//! fao_section: "02-factory-services"
//! fao_subsection: "tests"
//! fao_type: "test"
//! fao_scope: "code"
//! fao_description: "Insight generation against a local chat-completions stub."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use fao_common::config::AiConfig;
use fao_core::{ChatCompletionClient, InsightBackend, InsightCache, InsightGenerator};
use fao_sim::{CameraAnalysis, MachineStatus, Observation};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct StubState {
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    reply: Arc<Mutex<Option<Value>>>,
}

async fn completions(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    state.seen.lock().unwrap().push((auth, body));
    match state.reply.lock().unwrap().clone() {
        Some(reply) => Ok(Json(reply)),
        None => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn spawn_stub(reply: Option<Value>) -> (SocketAddr, StubState) {
    let state = StubState::default();
    *state.reply.lock().unwrap() = reply;
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn ai_config(base_url: String) -> AiConfig {
    AiConfig {
        api_key: Some("sk-local".into()),
        base_url,
        request_timeout: Duration::from_secs(2),
        ..AiConfig::default()
    }
}

fn generator(config: &AiConfig) -> (InsightGenerator, Arc<InsightCache>) {
    let client = ChatCompletionClient::from_config(config).unwrap().unwrap();
    let cache = Arc::new(InsightCache::new());
    (
        InsightGenerator::new(InsightBackend::External(client), Arc::clone(&cache)),
        cache,
    )
}

fn observations() -> Vec<Observation> {
    vec![Observation {
        camera_id: "cam-1".into(),
        location: "Assembly Line A".into(),
        timestamp: Utc::now(),
        analysis: CameraAnalysis::from_counts(22, Vec::new(), 4, MachineStatus::Operational),
    }]
}

#[tokio::test]
async fn external_backend_lines_become_insights() {
    let content = "Assembly: Optimize feeder cadence - 8% throughput\n\n  Packaging: Schedule belt service - fewer stops  \nStorage: Reorganize bins - 10min/day\nA\nB\nC\n";
    let (addr, stub) = spawn_stub(Some(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })))
    .await;
    let (generator, cache) = generator(&ai_config(format!("http://{addr}/v1")));

    let insights = generator.generate_insights(&observations()).await;
    assert_eq!(insights.len(), 5);
    assert_eq!(insights[1], "Packaging: Schedule belt service - fewer stops");
    assert_eq!(cache.get("insight-0").as_deref(), Some(insights[0].as_str()));

    let seen = stub.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-local"));
    assert_eq!(body["model"], "gpt-4-vision");
    assert_eq!(body["max_tokens"], 500);
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("Camera: cam-1 - Assembly Line A"));
    assert!(prompt.contains("Activity Level: 0.55"));
}

#[tokio::test]
async fn server_error_falls_back_to_template() {
    let (addr, _stub) = spawn_stub(None).await;
    let (generator, cache) = generator(&ai_config(format!("http://{addr}/v1")));
    let insights = generator.generate_insights(&observations()).await;
    assert_eq!(insights.len(), 5);
    assert!(insights[0].starts_with("Assembly Line A: Optimize conveyor speed"));
    assert!(cache.get("insight-4").is_some());
}

#[tokio::test]
async fn empty_completion_falls_back_to_template() {
    let (addr, _stub) = spawn_stub(Some(json!({
        "choices": [{"message": {"content": "   \n"}}]
    })))
    .await;
    let (generator, _cache) = generator(&ai_config(format!("http://{addr}/v1")));
    let insights = generator.generate_insights(&observations()).await;
    assert!(insights[3].starts_with("General: Implement cross-training"));
}

#[tokio::test]
async fn unreachable_backend_falls_back_to_template() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (generator, _cache) = generator(&ai_config(format!("http://{addr}/v1")));
    let insights = generator.generate_insights(&observations()).await;
    assert_eq!(insights.len(), 5);
    assert!(insights[1].starts_with("General: Reorganize"));
}
