//! Read-only REST API over a completed run.
//!
//! Endpoints (all GET):
//! - `/summary`: configuration, run summary and ledger head
//! - `/energy`: per-round energy table
//! - `/logs`: every trade attempt, optionally `?round=N`
//! - `/vehicles`: final per-vehicle summary
//! - `/ledger`: ledger entries, optionally `?from=N&to=M` by sequence
//! - `/ledger/verify`: recomputes the hash chain

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::sim::types::SimulationOutput;

pub use types::{ErrorResponse, LedgerQuery, LogsQuery, SummaryResponse, VerifyResponse};

/// Immutable application state shared across all request handlers.
///
/// Built once after the run completes and wrapped in `Arc`; nothing is
/// written after that, so no locks are needed.
pub struct AppState {
    pub output: SimulationOutput,
}

impl AppState {
    pub fn new(output: SimulationOutput) -> Self {
        Self { output }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/summary", get(handlers::get_summary))
        .route("/energy", get(handlers::get_energy))
        .route("/logs", get(handlers::get_logs))
        .route("/vehicles", get(handlers::get_vehicles))
        .route("/ledger", get(handlers::get_ledger))
        .route("/ledger/verify", get(handlers::verify_ledger))
        .with_state(state)
}

/// Binds to `addr` and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
