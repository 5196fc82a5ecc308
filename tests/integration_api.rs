//! Integration tests for the REST API feature.

#![cfg(feature = "api")]

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

use v2v_market_sim::api::{AppState, router};
use v2v_market_sim::config::ScenarioConfig;

/// Runs a dense scenario and wraps its output as API state.
fn build_api_state() -> Arc<AppState> {
    let mut scenario = ScenarioConfig::rush_hour();
    scenario.simulation.rounds = 30;
    Arc::new(AppState::new(common::run_scenario(&scenario)))
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn summary_matches_served_run() {
    let state = build_api_state();
    let (status, json) = get(state.clone(), "/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ledger_entries"], state.output.ledger.len());
    assert_eq!(json["ledger_head"], state.output.ledger_head.as_str());
    assert_eq!(json["config"]["simulation"]["vehicles"], 40);
    assert_eq!(json["config"]["simulation"]["network"], "standard");
}

#[tokio::test]
async fn logs_filter_by_round() {
    let state = build_api_state();
    let expected = state.output.logs.iter().filter(|l| l.round == 3).count();
    let (status, json) = get(state, "/logs?round=3").await;
    assert_eq!(status, StatusCode::OK);
    let logs = json.as_array().unwrap();
    assert_eq!(logs.len(), expected);
    for l in logs {
        assert_eq!(l["round"], 3);
        assert!(l["outcome"].as_str().is_some());
    }
}

#[tokio::test]
async fn full_ledger_verifies() {
    let state = build_api_state();
    let entries = state.output.ledger.len();

    let (status, json) = get(state.clone(), "/ledger").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().map(Vec::len), Some(entries));

    let (status, json) = get(state, "/ledger/verify").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert_eq!(json["entries"], entries);
}

#[tokio::test]
async fn inverted_ledger_range_is_rejected() {
    let (status, json) = get(build_api_state(), "/ledger?from=9&to=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("from"));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let req = Request::builder()
        .uri("/state")
        .body(Body::empty())
        .unwrap();
    let resp = router(build_api_state()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
