use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;
use crate::ticketing::{ArtifactError, ConflictKind, TicketingError};
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {message}")]
    ValidationError {
        field: Option<&'static str>,
        message: String,
    },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Storage error")]
    StorageError(#[from] StoreError),

    #[error("Ticket artifact error")]
    ArtifactError(#[from] ArtifactError),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError {
            field: None,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StorageError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ArtifactError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::StorageError(_) => "TRANSIENT_STORAGE_ERROR",
            AppError::ArtifactError(_) => "ARTIFACT_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError { message, .. }
            | AppError::AuthError(message)
            | AppError::Forbidden(message)
            | AppError::NotFound(message) => {
                warn!(error = ?self, message = %message, "Request rejected");
            }
            AppError::Conflict(kind) => {
                warn!(reason = kind.as_str(), "Request conflicted");
            }
            AppError::StorageError(e) => {
                error!(error = ?e, "Storage error");
            }
            AppError::ArtifactError(e) => {
                error!(error = ?e, "Ticket artifact error");
            }
            AppError::InternalServerError(message) => {
                error!(error = ?self, message = %message, "Application error");
            }
        }
    }

    /// Client-safe detail object, if the error carries any.
    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError { field: Some(field), .. } => Some(json!({ "field": field })),
            AppError::Conflict(kind) => Some(json!({ "reason": kind.as_str() })),
            _ => None,
        }
    }
}

impl From<TicketingError> for AppError {
    fn from(err: TicketingError) -> Self {
        match err {
            TicketingError::NotFound(resource) => {
                AppError::NotFound(format!("The {resource} was not found"))
            }
            TicketingError::Conflict(kind) => AppError::Conflict(kind),
            TicketingError::Validation { field, message } => AppError::ValidationError {
                field: Some(field),
                message: format!("{field} {message}"),
            },
            TicketingError::Forbidden { .. } => AppError::Forbidden(err.to_string()),
            TicketingError::Storage(e) => AppError::StorageError(e),
            TicketingError::Artifact(e) => AppError::ArtifactError(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError { message, .. }
            | AppError::AuthError(message)
            | AppError::Forbidden(message)
            | AppError::NotFound(message)
            | AppError::InternalServerError(message) => message.clone(),
            AppError::Conflict(kind) => kind.to_string(),
            AppError::StorageError(_) => {
                "Storage is temporarily unavailable, please retry later".to_string()
            }
            AppError::ArtifactError(_) => "The ticket image could not be produced".to_string(),
        };

        error_response(code, public_message, self.details(), status)
    }
}
