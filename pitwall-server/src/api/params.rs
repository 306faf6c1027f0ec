//! Shared query parameters and response shapes

use axum::Json;
use pitwall_common::api::ApiResponse;
use serde::{Deserialize, Serialize};

use super::correlation::CorrelationId;
use crate::db::page_bounds;
use crate::services::ListingSource;

/// `?season&limit&offset&active`
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub season: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub active: Option<bool>,
}

impl ListParams {
    pub fn bounds(&self) -> (i64, i64) {
        page_bounds(self.limit, self.offset)
    }
}

/// `?season`
#[derive(Debug, Default, Deserialize)]
pub struct SeasonParams {
    pub season: Option<i32>,
}

/// `?limit`
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

/// One page of a listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    /// Set for season-scoped listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ListingSource>,
}

impl<T> Page<T> {
    /// Slice an already materialized listing
    pub fn from_vec(all: Vec<T>, limit: i64, offset: i64, source: Option<ListingSource>) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Self {
            items,
            total,
            limit,
            offset,
            source,
        }
    }
}

/// Wrap handler output in the success envelope
pub fn envelope<T: Serialize>(data: T, correlation_id: CorrelationId) -> Json<ApiResponse<T>> {
    Json(ApiResponse::new(data, correlation_id.0))
}
