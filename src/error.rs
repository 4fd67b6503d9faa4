use std::error::Error;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::database::DatabaseError;
use crate::repo::GuardedDeleteError;
use crate::seed::SeedError;

/// Failures that stop the process before it starts serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to create DB connection pool: {0}")]
    Pool(#[from] diesel_async::pooled_connection::PoolError),

    #[error("failed to synchronise the schema: {0}")]
    Schema(#[source] DatabaseError),

    #[error("failed to load seed data: {0}")]
    SeedSource(#[from] SeedError),

    #[error("failed to write seed data: {0}")]
    Seed(#[source] DatabaseError),
}

/// Errors a handler can return. Each variant maps to one status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyDeleted(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyDeleted(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl<E: Error> From<GuardedDeleteError<E>> for ApiError {
    fn from(err: GuardedDeleteError<E>) -> Self {
        match err {
            GuardedDeleteError::NotFound(_) => ApiError::NotFound(err.to_string()),
            GuardedDeleteError::AlreadyDeleted(_) => ApiError::AlreadyDeleted(err.to_string()),
            GuardedDeleteError::Store(e) => internal_error(e),
        }
    }
}

/// Build a 500 response for an error
pub fn internal_error<E>(err: E) -> ApiError
where
    E: Error,
{
    error!("Request failed: {}", err);
    ApiError::Internal(err.to_string())
}
