//! Error types for the gateway crate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_broker::BrokerError;
use serde_json::json;

/// Errors that can occur during gateway request handling.
///
/// Failed tunnel operations are not errors at this level; they are
/// finalized as regular responses by the route handlers.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// An error propagated from the completion broker.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// The request is malformed or contains invalid values.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::Broker(BrokerError::UnknownOperation(_)) => StatusCode::NOT_FOUND,
            GatewayError::Broker(BrokerError::StillPending(_)) => StatusCode::ACCEPTED,
            GatewayError::Broker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
