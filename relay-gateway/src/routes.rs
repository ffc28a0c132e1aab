//! Axum route handlers for the relay gateway.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use relay_broker::{BrokerError, CompletionBroker, StartResult};
use relay_core::{CorrelationId, Outcome, TunnelRequest};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{backend::TunnelBackend, error::GatewayError};

/// Where the web UI lands after a tunnel mutation, successful or not.
pub const TUNNELS_PAGE: &str = "/#/tunnels";

// ── Shared state ─────────────────────────────────────────────────────────────

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<CompletionBroker>,
    pub backend: Arc<dyn TunnelBackend>,
}

impl AppState {
    #[must_use]
    pub fn new(broker: Arc<CompletionBroker>, backend: Arc<dyn TunnelBackend>) -> Self {
        Self { broker, backend }
    }
}

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTunnelBody {
    pub domain: String,
    #[serde(default)]
    pub client_addr: Option<String>,
    pub client_port: u32,
}

impl From<CreateTunnelBody> for TunnelRequest {
    fn from(body: CreateTunnelBody) -> Self {
        let mut request = TunnelRequest::new(body.domain, body.client_port);
        if let Some(addr) = body.client_addr.filter(|a| !a.is_empty()) {
            request.client_addr = addr;
        }
        request
    }
}

#[derive(Debug, Deserialize)]
pub struct DomainQuery {
    pub domain: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadingQuery {
    pub id: String,
}

/// Body of a `202 Accepted` response telling the client where to poll.
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub id: CorrelationId,
    pub poll: String,
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/tunnels", get(list_tunnels).post(create_tunnel))
        .route("/delete-tunnel", post(delete_tunnel))
        .route("/loading", get(loading))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /health`: liveness probe with the number of parked operations.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({"status": "ok", "pending": state.broker.pending_count()})),
    )
}

/// `GET /tunnels`: list provisioned tunnels.
pub async fn list_tunnels(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.backend.list_tunnels().await)
}

/// `POST /tunnels`: provision a tunnel through the completion broker.
///
/// # Errors
/// Returns [`GatewayError::Broker`] if the operation cannot be started.
pub async fn create_tunnel(
    State(state): State<AppState>,
    Form(body): Form<CreateTunnelBody>,
) -> Result<Response, GatewayError> {
    let request = TunnelRequest::from(body);
    let backend = Arc::clone(&state.backend);
    let work = async move {
        match backend.create_tunnel(request).await {
            Ok(tunnel) => {
                info!(domain = %tunnel.domain, "tunnel create finished");
                Outcome::success(TUNNELS_PAGE)
            }
            Err(e) => Outcome::failure(e.to_string()),
        }
    };
    start(&state.broker, work).await
}

/// `POST /delete-tunnel?domain=<domain>`: tear a tunnel down through the
/// completion broker.
///
/// # Errors
/// Returns [`GatewayError::Broker`] if the operation cannot be started.
pub async fn delete_tunnel(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> Result<Response, GatewayError> {
    let backend = Arc::clone(&state.backend);
    let work = async move {
        match backend.delete_tunnel(&query.domain).await {
            Ok(()) => Outcome::success(TUNNELS_PAGE),
            Err(e) => Outcome::failure(e.to_string()),
        }
    };
    start(&state.broker, work).await
}

/// `GET /loading?id=<id>`: wait for a pending operation and finalize it.
///
/// Blocks until the operation finishes unless the broker has a retrieve
/// limit, in which case the client is sent back here with the same id.
///
/// # Errors
/// Returns [`GatewayError::InvalidRequest`] for a malformed id and
/// [`GatewayError::Broker`] for an unknown or already consumed one.
pub async fn loading(
    State(state): State<AppState>,
    Query(query): Query<LoadingQuery>,
) -> Result<Response, GatewayError> {
    let id: CorrelationId = query
        .id
        .parse()
        .map_err(|e| GatewayError::InvalidRequest(format!("{e}")))?;

    match state.broker.retrieve(id).await {
        Ok(outcome) => Ok(finalize(outcome)),
        Err(BrokerError::StillPending(id)) => Ok(pending(id)),
        Err(e) => Err(e.into()),
    }
}

// ── Finalization helpers ──────────────────────────────────────────────────────

async fn start<F>(broker: &CompletionBroker, work: F) -> Result<Response, GatewayError>
where
    F: std::future::Future<Output = Outcome> + Send + 'static,
{
    let budget = broker.config().wait_budget;
    match broker.start_and_wait(work, budget).await? {
        StartResult::Completed(outcome) => Ok(finalize(outcome)),
        StartResult::Pending(id) => Ok(pending(id)),
    }
}

fn finalize(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Success(target) => Redirect::to(&target).into_response(),
        Outcome::Failure(reason) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": reason, "redirect": TUNNELS_PAGE})),
        )
            .into_response(),
    }
}

fn pending(id: CorrelationId) -> Response {
    let poll = format!("/loading?id={id}");
    (
        StatusCode::ACCEPTED,
        [(header::LOCATION, poll.clone())],
        Json(PendingResponse { id, poll }),
    )
        .into_response()
}
