//! Router-level tests for the search surface

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::{release, ScriptedEngine};
use ocdsearch::api::{build_router, AppState};
use ocdsearch::engine::{EngineCall, InMemoryEngine, SearchEngine};
use ocdsearch::indexing::{normalize, UuidGenerator};
use ocdsearch::search::SearchService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Engine with three tenders in `tenders`
async fn seeded_engine() -> InMemoryEngine {
    let engine = InMemoryEngine::new();
    let releases = [
        release("T-1", "Reparación de carreteras", "active"),
        release("T-2", "Suministro de agua potable", "complete"),
        release("T-3", "Reparación de puentes", "cancelled"),
    ];
    for raw in releases {
        let doc = normalize(raw, &UuidGenerator).unwrap().into_value();
        engine.index_document("tenders", "tender", &doc).await.unwrap();
    }
    engine
}

fn app(engine: &InMemoryEngine) -> Router {
    app_with(Arc::new(engine.clone()))
}

fn app_with(engine: Arc<dyn SearchEngine>) -> Router {
    let service = SearchService::new(engine, "tenders");
    build_router(AppState::new(Arc::new(service)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn tender_ids(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["tenderID"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_empty_search_returns_everything() {
    let engine = seeded_engine().await;
    let (status, body) = send(app(&engine), get("/search")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["start"], 0);
    assert_eq!(body["query"], json!({"query": {"match_all": {}}}));
    assert_eq!(tender_ids(&body), vec!["T-1", "T-2", "T-3"]);
}

#[tokio::test]
async fn test_text_and_status_filters() {
    let engine = seeded_engine().await;
    let (status, body) = send(
        app(&engine),
        post("/search", json!({"query": "reparación", "status": "active cancelled"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(tender_ids(&body), vec!["T-1", "T-3"]);
    assert_eq!(
        body["query"]["query"]["bool"]["must"][1],
        json!({"terms": {"status": ["active", "cancelled"]}})
    );
}

#[tokio::test]
async fn test_query_string_and_body_agree() {
    let engine = seeded_engine().await;

    let (_, from_query) = send(app(&engine), get("/search?status=complete&start=0")).await;
    let (_, from_body) = send(
        app(&engine),
        post("/search", json!({"status": "complete", "start": 0})),
    )
    .await;

    assert_eq!(from_query, from_body);
    assert_eq!(tender_ids(&from_query), vec!["T-2"]);
}

#[tokio::test]
async fn test_repeated_query_key_uses_first_value() {
    let engine = seeded_engine().await;
    let (status, body) = send(app(&engine), get("/search?status=active&status=complete")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], json!({"query": {"term": {"status": "active"}}}));
    assert_eq!(tender_ids(&body), vec!["T-1"]);
}

#[tokio::test]
async fn test_start_is_forwarded_as_offset() {
    let engine = seeded_engine().await;
    let (_, body) = send(app(&engine), get("/search?start=2")).await;

    assert_eq!(body["start"], 2);
    assert_eq!(body["total"], 3);
    assert_eq!(tender_ids(&body), vec!["T-3"]);
    assert!(engine.calls().contains(&EngineCall::Search {
        index: "tenders".to_string(),
        from: 2,
    }));
}

#[tokio::test]
async fn test_tid_filter() {
    let engine = seeded_engine().await;
    let (_, body) = send(app(&engine), post("/search", json!({"tid": ["T-3"]}))).await;
    assert_eq!(tender_ids(&body), vec!["T-3"]);
}

#[tokio::test]
async fn test_unknown_index_passes_engine_error_through() {
    let engine = seeded_engine().await;
    let (status, body) = send(app(&engine), get("/search?api=missing")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"]["type"], "index_not_found_exception");
    assert!(body.get("items").is_none());
}

#[tokio::test]
async fn test_engine_failure_is_json_error_not_transport_error() {
    let engine: Arc<dyn SearchEngine> = Arc::new(ScriptedEngine::unreachable());

    let (status, body) = send(app_with(engine.clone()), get("/search?query=x")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
    assert!(body.get("items").is_none());
    assert_eq!(body.as_object().unwrap().len(), 1);

    let (status, body) = send(app_with(engine), post("/search", json!({"status": "active"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_index_status_engine_failure_renders_app_error() {
    let engine: Arc<dyn SearchEngine> = Arc::new(ScriptedEngine::unreachable());
    let (status, body) = send(app_with(engine), get("/")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "ENGINE_ERROR");
    assert_eq!(body["error"]["status"], 502);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected() {
    let engine = seeded_engine().await;

    let (status, body) = send(app(&engine), get("/search?start=-5")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(app(&engine), post("/search", json!({"api": "a/b"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(!engine
        .calls()
        .iter()
        .any(|c| matches!(c, EngineCall::Search { .. })));
}

#[tokio::test]
async fn test_empty_post_body_searches_everything() {
    let engine = seeded_engine().await;
    let request = Request::builder()
        .method("POST")
        .uri("/search")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(&engine), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_index_status() {
    let engine = seeded_engine().await;
    let (status, body) = send(app(&engine), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["docs"]["count"], 3);
}

#[tokio::test]
async fn test_index_status_for_unknown_index() {
    let engine = seeded_engine().await;
    let (status, body) = send(app(&engine), get("/?api=missing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["status"], 404);
}

#[tokio::test]
async fn test_health() {
    let engine = InMemoryEngine::new();
    let (status, body) = send(app(&engine), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_metrics_endpoint_responds() {
    let engine = InMemoryEngine::new();
    let response = app(&engine).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
