//! HTTP API for overlay control and display clients
//!
//! Provides the control endpoint, the Server-Sent Events stream, the name
//! lookup and the provider settings endpoints.
//! Default port: 5000

pub mod stream;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::hub::{ControlError, SharedHub};
use crate::providers::{ProviderSettings, ProviderStore};
use crate::resolver::NameResolver;
use crate::state::OverlayState;

/// Default API port
pub const DEFAULT_API_PORT: u16 = 5000;

/// Shared state for API handlers
pub struct ApiState {
    /// Overlay state and its stream subscribers
    pub hub: SharedHub,
    /// Name lookup for the active mode
    pub resolver: Arc<dyn NameResolver>,
    /// Provider settings storage
    pub providers: Arc<ProviderStore>,
    /// Interval between keep-alive comments on idle streams
    pub keep_alive: Duration,
}

/// Response for POST /update
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub state: OverlayState,
}

/// Response for POST /api/providers
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
}

/// Response for GET /api/health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub subscribers: usize,
}

/// API error response
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("invalid provider settings: {0}")]
    InvalidProviders(serde_json::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Control(ControlError::MalformedRequest(_)) => StatusCode::BAD_REQUEST,
            ApiError::InvalidProviders(_) => StatusCode::BAD_REQUEST,
            ApiError::Control(ControlError::Encode(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/stream", get(stream::stream_state))
        .route("/update", post(update_state))
        .route("/names", get(list_names))
        .route("/api/providers", get(get_providers).post(set_providers))
        .route("/api/state", get(get_state))
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// POST /update - Apply a control action and return the new state
async fn update_state(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<UpdateResponse>, ApiError> {
    let new_state = state.hub.handle_raw(&body).inspect_err(|e| {
        warn!("Rejected update request: {}", e);
    })?;

    Ok(Json(UpdateResponse {
        success: true,
        state: new_state,
    }))
}

/// GET /names - Names available in the current mode
///
/// Resolver failures are logged and answered with an empty list.
async fn list_names(State(state): State<Arc<ApiState>>) -> Json<Vec<String>> {
    let mode = state.hub.snapshot().mode;

    match state.resolver.names(&mode).await {
        Ok(names) => Json(names),
        Err(e) => {
            warn!("Error fetching names for mode '{}': {}", mode, e);
            Json(Vec::new())
        },
    }
}

/// GET /api/providers - Stored provider settings (empty on failure)
async fn get_providers(State(state): State<Arc<ApiState>>) -> Json<ProviderSettings> {
    match state.providers.load().await {
        Ok(settings) => Json(settings),
        Err(e) => {
            warn!("Failed to load provider settings: {}", e);
            Json(ProviderSettings::new())
        },
    }
}

/// POST /api/providers - Replace provider settings with the body object
async fn set_providers(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<SaveResponse>, ApiError> {
    let settings: ProviderSettings =
        serde_json::from_slice(&body).map_err(ApiError::InvalidProviders)?;

    let success = match state.providers.save(&settings).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to save provider settings: {}", e);
            false
        },
    };

    Ok(Json(SaveResponse { success }))
}

/// GET /api/state - Current state without subscribing
async fn get_state(State(state): State<Arc<ApiState>>) -> Json<OverlayState> {
    Json(state.hub.snapshot())
}

/// GET /api/health - Health check endpoint
async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        subscribers: state.hub.subscriber_count(),
    })
}

/// Serve the API on an already bound listener until `shutdown` resolves
///
/// Open streams are closed when `shutdown` fires so the graceful shutdown
/// does not wait on them forever.
pub async fn serve(
    listener: TcpListener,
    state: Arc<ApiState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let hub = Arc::clone(&state.hub);
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Closing {} open stream(s)", hub.subscriber_count());
            hub.shutdown();
        })
        .await
        .context("API server error")?;

    Ok(())
}

/// Bind the API listener
///
/// `host` may be an IP literal (v4 or v6) or a hostname to resolve.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind API server to {} port {}", host, port))
}

/// Start the API server
pub async fn start_server(
    state: Arc<ApiState>,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = bind(host, port).await?;
    match listener.local_addr() {
        Ok(addr) => info!("Starting overlay API server on http://{}", addr),
        Err(_) => info!("Starting overlay API server on {} port {}", host, port),
    }

    serve(listener, state, shutdown).await
}

#[cfg(test)]
mod tests;
