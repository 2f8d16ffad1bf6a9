#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Density grid data types.
//!
//! These types describe the inputs and outputs of the density grid
//! aggregation: the rectangular region being binned ([`GeoBounds`]), the
//! geolocated rows fed into it ([`SourceRecord`]), and the sparse set of
//! populated cells it produces ([`GridResult`]). They carry no behaviour
//! beyond simple geometry helpers so they can be shared by the engine, the
//! record sources and the API layer.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A rectangular geographic region in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Southern latitude boundary.
    pub south: f64,
    /// Northern latitude boundary.
    pub north: f64,
    /// Western longitude boundary.
    pub west: f64,
    /// Eastern longitude boundary.
    pub east: f64,
}

impl GeoBounds {
    /// Creates new bounds from the given edges.
    ///
    /// Use [`GeoBounds::validate`] to check the ordering invariants.
    #[must_use]
    pub const fn new(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self {
            south,
            north,
            west,
            east,
        }
    }

    /// Checks that every edge is finite, within WGS84 range, and that
    /// `south < north` and `west < east`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBoundsError`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), InvalidBoundsError> {
        let edges = [self.south, self.north, self.west, self.east];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(InvalidBoundsError::new(*self, "edges must be finite"));
        }
        if self.south < -90.0 || self.north > 90.0 {
            return Err(InvalidBoundsError::new(
                *self,
                "latitude must be within [-90, 90]",
            ));
        }
        if self.west < -180.0 || self.east > 180.0 {
            return Err(InvalidBoundsError::new(
                *self,
                "longitude must be within [-180, 180]",
            ));
        }
        if self.south >= self.north {
            return Err(InvalidBoundsError::new(*self, "south must be below north"));
        }
        if self.west >= self.east {
            return Err(InvalidBoundsError::new(*self, "west must be below east"));
        }
        Ok(())
    }

    /// Height of the region in degrees of latitude.
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Width of the region in degrees of longitude.
    #[must_use]
    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    /// Whether the point lies inside the region, edges included.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south..=self.north).contains(&latitude)
            && (self.west..=self.east).contains(&longitude)
    }
}

/// Error returned when a [`GeoBounds`] violates its ordering or range rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidBoundsError {
    /// The offending bounds.
    pub bounds: GeoBounds,
    /// Which rule was violated.
    pub reason: &'static str,
}

impl InvalidBoundsError {
    const fn new(bounds: GeoBounds, reason: &'static str) -> Self {
        Self { bounds, reason }
    }
}

impl std::fmt::Display for InvalidBoundsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid bounds (south={}, north={}, west={}, east={}): {}",
            self.bounds.south, self.bounds.north, self.bounds.west, self.bounds.east, self.reason
        )
    }
}

impl std::error::Error for InvalidBoundsError {}

/// One geolocated input row for the density grid.
///
/// Coordinates are optional because record sources may hand over rows with
/// missing geometry; the aggregation counts such rows but bins none of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Number of dwelling units on the parcel (the summed attribute).
    pub units: Option<f64>,
    /// Construction year.
    pub year_built: Option<i32>,
    /// Free-form current-use label (e.g. `"1_residential"`).
    pub land_use: Option<String>,
}

impl SourceRecord {
    /// Creates a record at the given point with no attributes.
    #[must_use]
    pub const fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            units: None,
            year_built: None,
            land_use: None,
        }
    }

    /// Sets the unit count.
    #[must_use]
    pub const fn with_units(mut self, units: f64) -> Self {
        self.units = Some(units);
        self
    }

    /// Sets the construction year.
    #[must_use]
    pub const fn with_year_built(mut self, year: i32) -> Self {
        self.year_built = Some(year);
        self
    }

    /// Sets the current-use label.
    #[must_use]
    pub fn with_land_use(mut self, land_use: impl Into<String>) -> Self {
        self.land_use = Some(land_use.into());
        self
    }

    /// Returns `(latitude, longitude)` when both are present and finite.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Which per-cell quantity ranks cells and feeds the heatmap weight.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DensityMetric {
    /// Summed unit count per cell.
    #[default]
    Units,
    /// Number of records per cell.
    Records,
}

/// Column/row position of a cell within the grid.
///
/// Ordered by `(x, y)` so cell maps iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    /// Column, counted eastward from the western edge.
    pub x: u32,
    /// Row, counted northward from the southern edge.
    pub y: u32,
}

impl CellIndex {
    /// Creates a new cell index.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A finalized, non-empty grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    /// Column index in `[0, grid_size)`.
    pub x: u32,
    /// Row index in `[0, grid_size)`.
    pub y: u32,
    /// Latitude of the cell center.
    pub center_lat: f64,
    /// Longitude of the cell center.
    pub center_lng: f64,
    /// Southern edge of the cell.
    pub south: f64,
    /// Northern edge of the cell.
    pub north: f64,
    /// Western edge of the cell.
    pub west: f64,
    /// Eastern edge of the cell.
    pub east: f64,
    /// Number of records binned into this cell.
    pub record_count: u64,
    /// Sum of unit counts.
    pub attribute_sum: f64,
    /// `attribute_sum / record_count`, rounded to one decimal.
    pub average_attribute: f64,
    /// Records whose use matched the category keyword.
    pub category_count: u64,
    /// Running mean of valid construction years, if any were seen.
    pub running_year_average: Option<f64>,
    /// Ranking weight, chosen by the [`DensityMetric`].
    pub density_score: f64,
}

impl GridCell {
    /// The cell's grid position.
    #[must_use]
    pub const fn index(&self) -> CellIndex {
        CellIndex::new(self.x, self.y)
    }
}

/// Summary of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridMetadata {
    /// All input records, including skipped ones.
    pub total_records: u64,
    /// Records dropped for missing or non-finite coordinates.
    pub skipped_records: u64,
    /// Grid dimension (the grid is `grid_size × grid_size`).
    pub grid_size: u32,
    /// Number of non-empty cells.
    pub cell_count: u64,
    /// Density score of the hottest cell, or `0` with no cells.
    pub max_density: f64,
    /// Metric used for `density_score`.
    pub density_metric: DensityMetric,
    /// Wall-clock aggregation time in milliseconds.
    pub processing_time_ms: u64,
    /// Region the grid was laid over.
    pub bounds: GeoBounds,
}

/// Output of one aggregation run: cells sorted by descending density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResult {
    /// Non-empty cells, hottest first.
    pub cells: Vec<GridCell>,
    /// Run summary.
    pub metadata: GridMetadata,
}
