use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures reported by a synthesis engine.
///
/// The `Display` text is what the client sees in the 500 body.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Unknown character: {0}")]
    UnknownCharacter(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", message);
        } else {
            tracing::warn!(status = status.as_u16(), "Request rejected: {}", message);
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = AppError::Validation("text is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_engine_error_maps_to_internal_error() {
        let err = AppError::from(EngineError::Synthesis("model crashed".into()));
        assert_eq!(err.to_string(), "Synthesis failed: model crashed");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
