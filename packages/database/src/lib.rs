#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Record sources for the density grid.
//!
//! A [`RecordSource`] hands the aggregation a fully materialized list of
//! geolocated parcel records for a region. Three implementations exist:
//!
//! * [`postgis::PostgisRecordSource`] queries the `parcels` table through
//!   `switchy_database`, retrying transient failures
//! * [`geojson_file::GeoJsonRecordSource`] serves a cadastral `GeoJSON`
//!   `FeatureCollection` loaded once at startup
//! * [`memory::MemoryRecordSource`] wraps a `Vec` for tests and offline use
//!
//! Retries belong here, at the fetch boundary. The aggregation itself
//! never retries.

pub mod db;
pub mod geojson_file;
pub mod memory;
pub mod postgis;
pub mod retry;

use async_trait::async_trait;
use parcel_map_grid_models::{GeoBounds, SourceRecord};

pub use geojson_file::GeoJsonRecordSource;
pub use memory::MemoryRecordSource;
pub use postgis::PostgisRecordSource;

/// Errors that can occur while fetching records.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Could not establish a database connection.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Supplies the raw records for one aggregation request.
///
/// Implementations return every record they consider inside `bounds` in one
/// list; callers never paginate.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short label used in logs (e.g. `"postgis"`).
    fn name(&self) -> &str;

    /// Fetches all records within `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying store fails.
    async fn fetch_records(&self, bounds: &GeoBounds) -> Result<Vec<SourceRecord>, SourceError>;
}
