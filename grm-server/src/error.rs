//! HTTP error mapping: validation fails fast as 4xx, missing data is 404,
//! upstream trouble is 5xx with the underlying message attached.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grm_collect::CollectError;
use grm_core::geometry::GeometryError;
use grm_gee::GeeError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed coordinates or missing required query parameters
    #[error("{0}")]
    BadRequest(String),

    /// No qualifying data for the query
    #[error("{0}")]
    NotFound(String),

    /// The external service failed or is unreachable
    #[error("{0}")]
    Upstream(String),

    /// Local failure (I/O, CSV)
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<GeometryError> for ApiError {
    fn from(e: GeometryError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<GeeError> for ApiError {
    fn from(e: GeeError) -> Self {
        match e {
            GeeError::Geometry(g) => ApiError::BadRequest(g.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<CollectError> for ApiError {
    fn from(e: CollectError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
