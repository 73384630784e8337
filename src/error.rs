//! Service-level error taxonomy and HTTP response mapping.
//!
//! Every fallible operation in the wallet, bet, settlement, and auth
//! services returns a [`ServiceError`]. The API layer converts them into
//! JSON bodies carrying a machine-readable kind and a human-readable
//! message.

use crate::store::DbError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("{0}")]
    Conflict(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("event {0} is closed")]
    EventClosed(i64),

    #[error("storage failure")]
    Store(#[source] DbError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Stable machine-readable kind for API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidArgument(_) => "invalid_argument",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InsufficientFunds => "insufficient_funds",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::InvalidCredentials => "invalid_credentials",
            ServiceError::EventClosed(_) => "event_closed",
            ServiceError::Store(_) => "store_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidArgument(_)
            | ServiceError::InsufficientFunds
            | ServiceError::Conflict(_)
            | ServiceError::EventClosed(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => ServiceError::NotFound(what),
            DbError::InsufficientFunds => ServiceError::InsufficientFunds,
            DbError::Duplicate(what) => ServiceError::Conflict(what),
            other => ServiceError::Store(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if let ServiceError::Store(ref err) = self {
            error!("store error: {err}");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}
