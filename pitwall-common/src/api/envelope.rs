//! Response envelope
//!
//! Every response body is `{success, data | error, correlationId, timestamp}`.
//! The correlation id is taken from the `x-correlation-id` request header when present,
//! otherwise generated.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Request/response header carrying the correlation id
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Successful response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Always `true`
    pub success: bool,
    pub data: T,
    pub correlation_id: String,
    /// RFC 3339 timestamp with millisecond precision
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, correlation_id: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            correlation_id: correlation_id.into(),
            timestamp: now_timestamp(),
        }
    }
}

/// Error details inside an error envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable code (e.g. `NOT_FOUND`)
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// Error response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Always `false`
    pub success: bool,
    pub error: ApiErrorBody,
    pub correlation_id: String,
    pub timestamp: String,
}

impl ApiErrorResponse {
    pub fn new(error: ApiErrorBody, correlation_id: impl Into<String>) -> Self {
        Self {
            success: false,
            error,
            correlation_id: correlation_id.into(),
            timestamp: now_timestamp(),
        }
    }
}

/// Generate a correlation id of the form `req-<millis>-<8 hex chars>`
pub fn generate_correlation_id() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    format!("req-{}-{}", Utc::now().timestamp_millis(), &simple[..8])
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
