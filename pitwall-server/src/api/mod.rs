//! HTTP API handlers
//!
//! One router function per resource; `build_router` merges them and wraps the result in
//! the correlation middleware.

pub mod admin;
pub mod circuits;
pub mod constructors;
pub mod correlation;
pub mod drivers;
pub mod health;
pub mod params;
pub mod races;
pub mod sync;

pub use admin::admin_routes;
pub use circuits::circuit_routes;
pub use constructors::constructor_routes;
pub use correlation::{correlation_middleware, CorrelationId};
pub use drivers::driver_routes;
pub use health::health_routes;
pub use races::race_routes;
pub use sync::sync_routes;

use axum::http::Uri;

use crate::ApiError;

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {} not found", uri.path()))
}
