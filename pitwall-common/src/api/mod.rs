//! Shared API request/response types

pub mod envelope;

pub use envelope::{
    generate_correlation_id, ApiErrorBody, ApiErrorResponse, ApiResponse, CORRELATION_ID_HEADER,
};
