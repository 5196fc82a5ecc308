//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::sim::ledger::{LedgerEntry, verify_chain};
use crate::sim::types::{EnergyRow, TradeAttempt, VehicleSummary};

use super::AppState;
use super::types::{ErrorResponse, LedgerQuery, LogsQuery, SummaryResponse, VerifyResponse};

fn bad_request(error: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

/// `GET /summary` → 200 + `SummaryResponse` JSON
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<SummaryResponse> {
    let out = &state.output;
    Json(SummaryResponse {
        config: out.config.clone(),
        summary: out.summary.clone(),
        ledger_entries: out.ledger.len(),
        ledger_head: out.ledger_head.clone(),
    })
}

/// `GET /energy` → 200 + `Vec<EnergyRow>` JSON
pub async fn get_energy(State(state): State<Arc<AppState>>) -> Json<Vec<EnergyRow>> {
    Json(state.output.energy.clone())
}

/// Returns trade attempts, optionally for a single round.
///
/// `GET /logs?round=0` → 400, rounds start at 1
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    if query.round == Some(0) {
        return Err(bad_request("`round` starts at 1".to_string()));
    }
    let logs: Vec<TradeAttempt> = state
        .output
        .logs
        .iter()
        .filter(|l| query.round.is_none_or(|r| l.round == r))
        .cloned()
        .collect();
    Ok(Json(logs))
}

/// `GET /vehicles` → 200 + `Vec<VehicleSummary>` JSON
pub async fn get_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<VehicleSummary>> {
    Json(state.output.vehicles.clone())
}

/// Returns ledger entries, optionally filtered by sequence range.
///
/// `GET /ledger?from=N&to=M` → inclusive range
/// `GET /ledger?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_ledger(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LedgerQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(u64::MAX);

    if from > to {
        return Err(bad_request(format!(
            "`from` ({from}) must be <= `to` ({to})"
        )));
    }

    let entries: Vec<LedgerEntry> = state
        .output
        .ledger
        .iter()
        .filter(|e| e.sequence >= from && e.sequence <= to)
        .cloned()
        .collect();
    Ok(Json(entries))
}

/// `GET /ledger/verify` → 200 + `VerifyResponse` JSON
pub async fn verify_ledger(State(state): State<Arc<AppState>>) -> Json<VerifyResponse> {
    let out = &state.output;
    let result = verify_chain(&out.ledger, &out.ledger_head);
    Json(VerifyResponse {
        valid: result.is_ok(),
        entries: out.ledger.len(),
        head: out.ledger_head.clone(),
        error: result.err().map(|e| e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::ScenarioConfig;
    use crate::sim::engine::Simulation;
    use crate::sim::ledger::Ledger;
    use crate::sim::market::Match;
    use crate::sim::types::SimConfig;

    /// Smoke run with a ledger of ten known entries swapped in.
    fn make_test_state(tamper: bool) -> Arc<AppState> {
        let config = SimConfig::from_scenario(&ScenarioConfig::smoke()).unwrap();
        let mut output = Simulation::new(config).run().unwrap();

        let mut ledger = Ledger::new();
        for i in 0..10u32 {
            ledger.append(&Match {
                round: i / 2 + 1,
                seller_id: i % 3,
                buyer_id: 5 - i % 3,
                quantity_kwh: 0.5 + f64::from(i) * 0.1,
                ask_price: 0.14,
                bid_price: 0.24,
                clearing_price: 0.19,
                latency_ms: 30.0,
                distance_m: 5.0,
                alignment: 0.9,
            });
        }
        output.ledger = ledger.entries().to_vec();
        output.ledger_head = ledger.head().to_string();
        if tamper {
            output.ledger[4].total_cost = 99.0;
        }
        Arc::new(AppState::new(output))
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn summary_returns_200() {
        let (status, json) = get_json(make_test_state(false), "/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("config").is_some());
        assert!(json.get("summary").is_some());
        assert_eq!(json["ledger_entries"], 10);
    }

    #[tokio::test]
    async fn energy_has_one_row_per_round() {
        let (status, json) = get_json(make_test_state(false), "/energy").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(5));
        assert_eq!(json[0]["round"], 1);
    }

    #[tokio::test]
    async fn vehicles_lists_the_fleet() {
        let (status, json) = get_json(make_test_state(false), "/vehicles").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(6));
    }

    #[tokio::test]
    async fn ledger_range_query() {
        let (status, json) = get_json(make_test_state(false), "/ledger?from=3&to=6").await;
        assert_eq!(status, StatusCode::OK);
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0]["sequence"], 3);
        assert_eq!(entries[3]["sequence"], 6);
    }

    #[tokio::test]
    async fn ledger_invalid_range_returns_400() {
        let (status, json) = get_json(make_test_state(false), "/ledger?from=10&to=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn logs_round_zero_returns_400() {
        let (status, _) = get_json(make_test_state(false), "/logs?round=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_reports_tampering() {
        let (_, ok) = get_json(make_test_state(false), "/ledger/verify").await;
        assert_eq!(ok["valid"], true);
        assert!(ok["error"].is_null());

        let (_, bad) = get_json(make_test_state(true), "/ledger/verify").await;
        assert_eq!(bad["valid"], false);
        assert!(bad["error"].as_str().unwrap().contains("entry 4"));
    }
}
