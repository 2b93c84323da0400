use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use regionstats_common::{ErrorResponse, LatencyQuery, LATENCY_PATH, MAX_REGIONS};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod extract;

use config::MAX_BODY_SIZE;
use dataset::Dataset;

/// Shared, read-only request context. Cloning shares the dataset's records.
#[derive(Clone)]
pub struct AppState {
    pub dataset: Dataset,
}

impl AppState {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

/// RegionStats Server
pub struct Server {
    config: ServerConfig,
    dataset: Dataset,
}

impl Server {
    /// Create a new server that answers queries against `dataset`
    pub fn new(config: ServerConfig, dataset: Dataset) -> Self {
        Self { config, dataset }
    }

    /// Get the server's configured address
    pub fn address(&self) -> SocketAddr {
        self.config.address
    }

    /// Create the application router with the given state
    pub fn create_router(state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers(Any);

        Router::new()
            .route(LATENCY_PATH, post(handle_latency).fallback(handle_method_not_allowed))
            .fallback(handle_not_found)
            .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the server, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(self, ready_tx: tokio::sync::oneshot::Sender<SocketAddr>) -> Result<(), Box<dyn std::error::Error>> {
        let records = self.dataset.len();
        let app = Self::create_router(AppState::new(self.dataset));
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, records, "listening");
        ready_tx.send(local_addr).ok();
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
        info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

/// Fallback for unknown paths.
pub async fn handle_not_found(uri: Uri) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("No route for {}", uri.path()))
}

/// Fallback for methods other than POST (and CORS preflight) on /api/latency.
pub async fn handle_method_not_allowed(method: Method) -> Response {
    let mut response = error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {} not allowed on {}", method, LATENCY_PATH),
    );
    response.headers_mut().insert(header::ALLOW, HeaderValue::from_static("POST, OPTIONS"));
    response
}

/// Handler for POST /api/latency: per-region latency and uptime statistics.
/// Malformed bodies are rejected with 400 and bodies over `MAX_BODY_SIZE` with 413;
/// every well-formed query gets one entry per region.
pub async fn handle_latency(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Request body exceeds maximum size of {} bytes", MAX_BODY_SIZE),
            );
        }
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };

    let query: LatencyQuery = match serde_json::from_slice(&body) {
        Ok(query) => query,
        Err(err) => {
            debug!(error = %err, "rejected latency query");
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", err));
        }
    };

    if query.regions.len() > MAX_REGIONS {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Query exceeds maximum of {} regions", MAX_REGIONS),
        );
    }
    if !query.threshold_ms.is_finite() {
        return error_response(StatusCode::BAD_REQUEST, "threshold_ms must be a finite number");
    }

    let response = aggregate::compute(&state.dataset, &query);
    debug!(
        regions = query.regions.len(),
        threshold_ms = query.threshold_ms,
        "computed latency statistics"
    );
    (StatusCode::OK, Json(response)).into_response()
}
