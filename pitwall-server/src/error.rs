//! API error type
//!
//! Handlers return [`ApiResult`]; the error becomes an envelope body with a status code.
//! The correlation middleware fills in the request's correlation id.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pitwall_common::api::{ApiErrorBody, ApiErrorResponse};
use thiserror::Error;

use crate::services::{LineupServiceError, SyncError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. creating a driver that already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream provider or lineup service failure (502)
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn into_message(self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Upstream(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = ApiErrorBody {
            code: self.code().to_string(),
            message: self.into_message(),
        };

        let mut response = (status, Json(ApiErrorResponse::new(body.clone(), ""))).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

impl From<pitwall_common::Error> for ApiError {
    fn from(err: pitwall_common::Error) -> Self {
        use pitwall_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                ApiError::Conflict(db_err.message().to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Database(e) => e.into(),
            SyncError::NotFound(msg) => ApiError::NotFound(msg),
            other @ (SyncError::AllSourcesFailed { .. } | SyncError::Source { .. }) => {
                ApiError::Upstream(other.to_string())
            }
        }
    }
}

impl From<LineupServiceError> for ApiError {
    fn from(err: LineupServiceError) -> Self {
        match err {
            LineupServiceError::Database(e) => e.into(),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceError;

    #[test]
    fn test_common_errors_map_to_statuses() {
        let not_found: ApiError = pitwall_common::Error::NotFound("race 'x'".to_string()).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid: ApiError =
            pitwall_common::Error::InvalidInput("number 0 outside 1-99".to_string()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let config: ApiError = pitwall_common::Error::Config("bad".to_string()).into();
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_sync_failures_are_upstream_errors() {
        let err: ApiError = SyncError::AllSourcesFailed {
            entity: "drivers",
            message: "historical unavailable".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let err: ApiError = SyncError::Source {
            entity: "races",
            source_name: "historical".to_string(),
            error: SourceError::RateLimited("historical".to_string()),
        }
        .into();
        assert_eq!(err.code(), "UPSTREAM_ERROR");
    }

    #[test]
    fn test_error_response_carries_body_extension() {
        let response = ApiError::Conflict("driver 'hamilton' already exists".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = response.extensions().get::<ApiErrorBody>().unwrap();
        assert_eq!(body.code, "CONFLICT");
    }
}
