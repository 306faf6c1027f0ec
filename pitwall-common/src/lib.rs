//! # Pitwall Common Library
//!
//! Shared code for the Pitwall service crates:
//! - Error taxonomy (`Error`, `Result`)
//! - Bootstrap configuration loading
//! - Identifier normalization and provider override tables
//! - API response envelope types
//! - Database initialization and schema

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod normalize;

pub use error::{Error, Result};
pub use normalize::IdentifierOverrides;
