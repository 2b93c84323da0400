use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the number of regions accepted in a single query.
pub const MAX_REGIONS: usize = 1_024;

/// Path of the single aggregation endpoint.
pub const LATENCY_PATH: &str = "/api/latency";

/// Error types for RegionStats client operations
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegionStatsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Query exceeds maximum of {0} regions")]
    TooManyRegions(usize),

    #[error("threshold_ms must be a finite number, got {0}")]
    InvalidThreshold(f64),

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

/// Request body for `POST /api/latency`.
///
/// `threshold_ms` deserializes from either a JSON integer or a JSON float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyQuery {
    pub regions: Vec<String>,
    pub threshold_ms: f64,
}

/// Per-region statistics. `region` echoes the caller's spelling, not the dataset's.
///
/// `avg_uptime` is a fraction in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    pub region: String,
    pub avg_latency: f64,
    pub p95_latency: f64,
    pub avg_uptime: f64,
    pub breaches: u64,
}

impl RegionStats {
    /// All-zero statistics, used for regions with no matching records.
    pub fn empty(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            avg_latency: 0.0,
            p95_latency: 0.0,
            avg_uptime: 0.0,
            breaches: 0,
        }
    }
}

/// Response body for `POST /api/latency`: one entry per requested region, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyResponse {
    pub regions: Vec<RegionStats>,
}

/// JSON error envelope returned by the server for all error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Result type for RegionStats client operations
pub type Result<T> = std::result::Result<T, RegionStatsError>;
