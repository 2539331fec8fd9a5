//! Mapping from domain failures to HTTP responses

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::error::SwapError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Error returned by every handler
#[derive(Debug)]
pub enum ApiError {
    Domain(SwapError),
    /// No usable `x-actor-id` header on a route that needs one
    MissingActor,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(SwapError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Domain(SwapError::Forbidden(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Domain(SwapError::InvalidState(_))
            | ApiError::Domain(SwapError::Conflict(_))
            | ApiError::Domain(SwapError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Domain(SwapError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MissingActor => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(SwapError::NotFound { .. }) => "not_found",
            ApiError::Domain(SwapError::Forbidden(_)) => "forbidden",
            ApiError::Domain(SwapError::InvalidState(_)) => "invalid_state",
            ApiError::Domain(SwapError::Conflict(_)) => "conflict",
            ApiError::Domain(SwapError::InvalidInput(_)) => "invalid_input",
            ApiError::Domain(SwapError::Internal(_)) => "internal",
            ApiError::MissingActor => "unauthenticated",
        }
    }
}

impl From<SwapError> for ApiError {
    fn from(e: SwapError) -> Self {
        ApiError::Domain(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Domain(SwapError::invalid_input(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Domain(SwapError::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Store details stay in the logs
            ApiError::Domain(SwapError::Internal(detail)) => {
                error!(detail = %detail, "Request failed with internal error");
                "internal server error".to_string()
            }
            ApiError::Domain(e) => e.to_string(),
            ApiError::MissingActor => "missing or malformed x-actor-id header".to_string(),
        };

        let body = ErrorBody {
            error: message,
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
