use regionstats_common::{
    ErrorResponse, LatencyQuery, LatencyResponse, RegionStats, RegionStatsError, Result, LATENCY_PATH,
    MAX_REGIONS,
};

/// RegionStats client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
}

/// RegionStats Client
pub struct Client {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build the URL of the latency endpoint.
    pub fn build_latency_url(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), LATENCY_PATH)
    }

    /// Fetch statistics for `regions`, one entry per region in the order given.
    /// Breaches count latencies strictly above `threshold_ms`.
    pub async fn latency<S: AsRef<str>>(&self, regions: &[S], threshold_ms: f64) -> Result<Vec<RegionStats>> {
        if regions.len() > MAX_REGIONS {
            return Err(RegionStatsError::TooManyRegions(MAX_REGIONS));
        }
        if !threshold_ms.is_finite() {
            return Err(RegionStatsError::InvalidThreshold(threshold_ms));
        }

        let query = LatencyQuery {
            regions: regions.iter().map(|r| r.as_ref().to_string()).collect(),
            threshold_ms,
        };

        let response = self
            .http_client
            .post(self.build_latency_url())
            .json(&query)
            .send()
            .await
            .map_err(|e| RegionStatsError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        let body: LatencyResponse = response
            .json()
            .await
            .map_err(|e| RegionStatsError::InvalidResponse(e.to_string()))?;
        Ok(body.regions)
    }
}

async fn parse_error_response(status: reqwest::StatusCode, response: reqwest::Response) -> RegionStatsError {
    let error_msg = response
        .json::<ErrorResponse>()
        .await
        .map(|r| r.error)
        .unwrap_or_else(|_| format!("Server returned status: {}", status));

    RegionStatsError::HttpError(status.as_u16(), error_msg)
}
