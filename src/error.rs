//! Error types for the Slasherz server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::datapack::DatapackError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Datapack error: {0}")]
    Datapack(#[from] DatapackError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Image storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid image name: {0}")]
    InvalidName(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("S3 SDK error: {0}")]
    SdkError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Datapack(e) => match e {
                DatapackError::InvalidClientData(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_client_data", e.to_string())
                }
                DatapackError::InvalidVersionKind(_) | DatapackError::MalformedVersion(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_version", e.to_string())
                }
                DatapackError::DuplicateIdentity(_)
                | DatapackError::EmptyCatalog
                | DatapackError::VersionOverflow(_) => {
                    (StatusCode::CONFLICT, "conflict", e.to_string())
                }
                DatapackError::CatalogUnavailable(_) => {
                    tracing::error!("Datapack unavailable: {}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "catalog_unavailable", e.to_string())
                }
                _ => {
                    tracing::error!("Datapack error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "datapack_error",
                        "Datapack error".to_string(),
                    )
                }
            },
            AppError::Storage(e) => match e {
                StorageError::InvalidName(name) => (
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    format!("Invalid image name: {}", name),
                ),
                StorageError::ObjectNotFound(name) => {
                    (StatusCode::NOT_FOUND, "not_found", format!("Image not found: {}", name))
                }
                _ => {
                    tracing::error!("Storage error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_error",
                        "Storage error".to_string(),
                    )
                }
            },
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
