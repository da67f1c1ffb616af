//! Error responses

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use openapi_server::models::ErrorResponse;
use tracing::error;

use crate::errors::VersiondError;

impl VersiondError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            VersiondError::ValidationError(_) => StatusCode::BAD_REQUEST,
            VersiondError::NotFound(_) => StatusCode::NOT_FOUND,
            VersiondError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            VersiondError::ValidationError(msg)
            | VersiondError::NotFound(msg)
            | VersiondError::Conflict(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for VersiondError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            error: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}
