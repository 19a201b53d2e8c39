use asset_contract::ErrorKind;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::gateway::GatewayError;

/// Failures surfaced by the REST handlers as plain-text responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("failed to submit transaction: {0}")]
    Submit(#[source] GatewayError),
    #[error("failed to evaluate transaction: {0}")]
    Evaluate(#[source] GatewayError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Submit(e) | ApiError::Evaluate(e) => {
                match e.contract_error().map(|c| c.kind()) {
                    Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
                    Some(ErrorKind::AlreadyExists) => StatusCode::CONFLICT,
                    Some(ErrorKind::InvalidArgument) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
        }
        (status, format!("{self}\n")).into_response()
    }
}
