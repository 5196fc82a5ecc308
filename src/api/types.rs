//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::sim::metrics::RunSummary;
use crate::sim::types::SimConfig;

/// Configuration and headline numbers of the served run.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub config: SimConfig,
    pub summary: RunSummary,
    pub ledger_entries: usize,
    pub ledger_head: String,
}

/// Optional round filter for `/logs`.
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub round: Option<u32>,
}

/// Optional sequence range for `/ledger` (both ends inclusive).
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub from: Option<u64>,
    pub to: Option<u64>,
}

/// Result of recomputing the ledger chain.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub entries: usize,
    pub head: String,
    /// Why verification failed, if it did.
    pub error: Option<String>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
