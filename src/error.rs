//! Error taxonomy shared by the gateway, the acquisition pipeline and the
//! HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::StageName;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or malformed required parameter
    #[error("{0}")]
    InvalidRequest(String),

    /// The catalog client raised; message is passed through verbatim
    #[error("{0}")]
    UpstreamFailure(String),

    /// A fatal acquisition stage did not complete
    #[error("{} failed: {}", .stage.failure_label(), .diagnostic)]
    AcquisitionFailed { stage: StageName, diagnostic: String },

    /// A background task panicked or was cancelled
    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        GatewayError::InvalidRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamFailure(_)
            | GatewayError::AcquisitionFailed { .. }
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            GatewayError::AcquisitionFailed { stage, .. } => json!({
                "error": self.to_string(),
                "stage": stage.as_str(),
            }),
            _ => json!({ "error": self.to_string() }),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::invalid("Title is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::UpstreamFailure("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Internal("task panicked".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_acquisition_message() {
        let err = GatewayError::AcquisitionFailed {
            stage: StageName::Fetch,
            diagnostic: "ERROR: Video unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Download failed: ERROR: Video unavailable");

        let err = GatewayError::AcquisitionFailed {
            stage: StageName::Import,
            diagnostic: "exit status 1".to_string(),
        };
        assert_eq!(err.to_string(), "Import failed: exit status 1");
    }
}
