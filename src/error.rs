use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// StoreError
///
/// Persistence-layer failure. Repository methods that surface errors (lookups
/// and listings) return this; it maps to a generic 500 at the HTTP boundary
/// with the detail kept in the logs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed")]
    Hash,
}

/// ApiError
///
/// The per-request error taxonomy. Every variant is terminal for the request
/// and carries a fixed client-facing message; the status mapping is:
///
/// - `Validation` -> 400 (missing/empty required fields, no store call made)
/// - `InvalidCredentials` -> 401 (login failure, cause never distinguished)
/// - `Forbidden` -> 403 (missing/invalid token or non-admin role)
/// - `NotFound` -> 404
/// - `Conflict` -> 409 (duplicate email)
/// - `Internal` -> 500 with the `{"error": ...}` body shape the product
///   endpoints use
/// - `Store` -> 500 with a generic message; the underlying error is logged
///   and never exposed to the client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Credenciales incorrectas")]
    InvalidCredentials,
    #[error("No autorizado")]
    Forbidden,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    Internal(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => mensaje(StatusCode::BAD_REQUEST, msg),
            ApiError::InvalidCredentials => {
                mensaje(StatusCode::UNAUTHORIZED, "Credenciales incorrectas")
            }
            ApiError::Forbidden => mensaje(StatusCode::FORBIDDEN, "No autorizado"),
            ApiError::NotFound(msg) => mensaje(StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => mensaje(StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": msg })),
            )
                .into_response(),
            ApiError::Store(err) => {
                tracing::error!("store error: {err:?}");
                mensaje(StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor")
            }
        }
    }
}

fn mensaje(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "mensaje": msg }))).into_response()
}
