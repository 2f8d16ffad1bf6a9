#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the parcel map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the grid result types to allow independent evolution of the API
//! contract.

use parcel_map_grid_models::{DensityMetric, GeoBounds, GridCell, GridMetadata, GridResult};
use serde::{Deserialize, Serialize};

/// Query parameters for the density grid endpoint.
///
/// Numeric parameters are taken as strings so malformed values produce the
/// API's JSON error body instead of the extractor's plain-text rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityGridQueryParams {
    /// Region id (e.g. `valencia`).
    pub region: Option<String>,
    /// Cells per axis, 1-500.
    pub grid_size: Option<String>,
    /// Ranking metric: `units` (default) or `records`.
    pub density_by: Option<String>,
}

/// One populated grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGridCell {
    /// Column index.
    pub x: u32,
    /// Row index.
    pub y: u32,
    /// Latitude of the cell center.
    pub center_lat: f64,
    /// Longitude of the cell center.
    pub center_lng: f64,
    /// Cell rectangle.
    pub bounds: GeoBounds,
    /// Parcels in the cell.
    pub record_count: u64,
    /// Total dwelling units in the cell.
    pub attribute_sum: f64,
    /// Average units per parcel, one decimal.
    pub average_attribute: f64,
    /// Residential parcels in the cell.
    pub category_count: u64,
    /// Mean construction year, if any parcel had a valid one.
    pub running_year_average: Option<f64>,
    /// Heatmap weight.
    pub density_score: f64,
}

impl From<GridCell> for ApiGridCell {
    fn from(cell: GridCell) -> Self {
        Self {
            x: cell.x,
            y: cell.y,
            center_lat: cell.center_lat,
            center_lng: cell.center_lng,
            bounds: GeoBounds::new(cell.south, cell.north, cell.west, cell.east),
            record_count: cell.record_count,
            attribute_sum: cell.attribute_sum,
            average_attribute: cell.average_attribute,
            category_count: cell.category_count,
            running_year_average: cell.running_year_average,
            density_score: cell.density_score,
        }
    }
}

/// Summary of a density grid run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGridMetadata {
    /// Records returned by the record source.
    pub total_records: u64,
    /// Records dropped for missing coordinates.
    pub skipped_records: u64,
    /// Cells per axis.
    pub grid_size: u32,
    /// Populated cells.
    pub cell_count: u64,
    /// Density score of the hottest cell.
    pub max_density: f64,
    /// Metric behind `densityScore`.
    pub density_by: DensityMetric,
    /// Aggregation time in milliseconds.
    pub processing_time_ms: u64,
    /// Region bounds the grid covers.
    pub bounds: GeoBounds,
}

impl From<GridMetadata> for ApiGridMetadata {
    fn from(meta: GridMetadata) -> Self {
        Self {
            total_records: meta.total_records,
            skipped_records: meta.skipped_records,
            grid_size: meta.grid_size,
            cell_count: meta.cell_count,
            max_density: meta.max_density,
            density_by: meta.density_metric,
            processing_time_ms: meta.processing_time_ms,
            bounds: meta.bounds,
        }
    }
}

/// Response from the density grid endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDensityGrid {
    /// Always `true`; errors use [`ApiError`].
    pub success: bool,
    /// Region id the grid was built for.
    pub region: String,
    /// Populated cells, hottest first.
    pub cells: Vec<ApiGridCell>,
    /// Run summary.
    pub metadata: ApiGridMetadata,
}

impl ApiDensityGrid {
    /// Wraps a grid result for the given region.
    #[must_use]
    pub fn new(region: impl Into<String>, result: GridResult) -> Self {
        Self {
            success: true,
            region: region.into(),
            cells: result.cells.into_iter().map(ApiGridCell::from).collect(),
            metadata: result.metadata.into(),
        }
    }
}

/// A region as listed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRegion {
    /// Region id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Country code.
    pub country: Option<String>,
    /// Region extent.
    pub bounds: GeoBounds,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Always `false`.
    pub success: bool,
    /// What went wrong.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
