use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use messaging::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Errors of the HTTP API with their status codes.
#[derive(Debug, Error)]
pub(crate) enum ApiError {
    /// The request carries no usable identity.
    #[error("Missing or invalid '{0}' header")]
    Unauthenticated(String),

    /// Rejected by an access policy before reaching the store.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The store refused or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Something outside the store went wrong. The details are logged, not returned.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) | Self::Store(StoreError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Store(StoreError::Invalid(_)) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::Conflict) => StatusCode::CONFLICT,
            Self::Store(StoreError::Closed) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &str {
        match self {
            Self::Unauthenticated(_) => "authentication_error",
            Self::Store(StoreError::NotFound { .. }) => "not_found_error",
            Self::Forbidden(_) | Self::Store(StoreError::Forbidden(_)) => "permission_error",
            Self::Store(StoreError::Invalid(_)) => "invalid_request_error",
            Self::Store(StoreError::Conflict) => "conflict_error",
            Self::Store(StoreError::Closed) | Self::Internal(_) => "internal_error",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::Internal(details) => {
                log::error!("Internal server error: {details}");
                "Internal server error".to_string()
            }
            Self::Store(StoreError::Closed) => {
                log::error!("Request failed, the database is closed");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let error_response = ErrorResponse {
            error: ErrorDetails {
                message,
                r#type: self.error_type().to_string(),
                code: status.as_u16(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}
