//! Correlation ids and envelope rewriting
//!
//! [`correlation_middleware`] resolves the request's correlation id, makes it available to
//! handlers through the [`CorrelationId`] extractor, echoes it as a response header, and
//! turns every error response (handler errors, extractor rejections, unknown routes) into
//! an error envelope carrying that id.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use pitwall_common::api::{
    generate_correlation_id, ApiErrorBody, ApiErrorResponse, CORRELATION_ID_HEADER,
};
use std::convert::Infallible;

const MAX_CORRELATION_ID_LEN: usize = 128;
const MAX_REJECTION_BODY: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CorrelationId>()
            .cloned()
            .unwrap_or_else(|| CorrelationId(generate_correlation_id())))
    }
}

/// Caller-supplied id if usable, else a fresh one
fn resolve_correlation_id(request: &Request) -> String {
    request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_CORRELATION_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_correlation_id)
}

pub async fn correlation_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = resolve_correlation_id(&request);
    request
        .extensions_mut()
        .insert(CorrelationId(correlation_id.clone()));

    let response = next.run(request).await;
    let status = response.status();

    let mut response = if let Some(body) = response.extensions().get::<ApiErrorBody>().cloned() {
        error_envelope(status, body, &correlation_id)
    } else if status.is_client_error() || status.is_server_error() {
        let message = rejection_message(response.into_body(), status).await;
        let body = ApiErrorBody {
            code: code_for_status(status).to_string(),
            message,
        };
        error_envelope(status, body, &correlation_id)
    } else {
        response
    };

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

fn error_envelope(status: StatusCode, body: ApiErrorBody, correlation_id: &str) -> Response {
    (status, Json(ApiErrorResponse::new(body, correlation_id))).into_response()
}

/// Plain-text body of a framework rejection, or the status reason
async fn rejection_message(body: Body, status: StatusCode) -> String {
    let text = axum::body::to_bytes(body, MAX_REJECTION_BODY)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        text
    }
}

fn code_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        StatusCode::UNPROCESSABLE_ENTITY => "VALIDATION_ERROR",
        s if s.is_client_error() => "CLIENT_ERROR",
        _ => "INTERNAL_ERROR",
    }
}
