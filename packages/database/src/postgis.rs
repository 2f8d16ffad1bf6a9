//! `PostGIS`-backed record source.
//!
//! Reads the `parcels` table populated by the cadastral ingestion job. Only
//! the columns the density grid needs are selected, and the bounds filter is
//! pushed down to the database so out-of-region rows never leave it.

use std::sync::Arc;

use async_trait::async_trait;
use moosicbox_json_utils::database::ToValue as _;
use parcel_map_grid_models::{GeoBounds, SourceRecord};
use switchy_database::{Database, DatabaseValue};

use crate::retry::{RetryPolicy, with_backoff};
use crate::{RecordSource, SourceError};

/// Selects parcels whose point lies inside the given bounds, edges
/// included. Parameters: `south, north, west, east`.
const PARCELS_IN_BOUNDS: &str = "SELECT latitude::DOUBLE PRECISION AS latitude,
        longitude::DOUBLE PRECISION AS longitude,
        units::DOUBLE PRECISION AS units,
        year_built::INTEGER AS year_built,
        current_use
 FROM parcels
 WHERE latitude BETWEEN $1 AND $2
   AND longitude BETWEEN $3 AND $4";

/// Record source over a `PostgreSQL`/`PostGIS` connection.
pub struct PostgisRecordSource {
    db: Arc<dyn Database>,
    retry: RetryPolicy,
}

impl PostgisRecordSource {
    /// Wraps an open connection with the default retry policy.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn query_once(&self, bounds: &GeoBounds) -> Result<Vec<SourceRecord>, SourceError> {
        let rows = self
            .db
            .query_raw_params(
                PARCELS_IN_BOUNDS,
                &[
                    DatabaseValue::Real64(bounds.south),
                    DatabaseValue::Real64(bounds.north),
                    DatabaseValue::Real64(bounds.west),
                    DatabaseValue::Real64(bounds.east),
                ],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| SourceRecord {
                latitude: row.to_value("latitude").unwrap_or(None),
                longitude: row.to_value("longitude").unwrap_or(None),
                units: row.to_value("units").unwrap_or(None),
                year_built: row.to_value("year_built").unwrap_or(None),
                land_use: row.to_value("current_use").unwrap_or(None),
            })
            .collect())
    }
}

#[async_trait]
impl RecordSource for PostgisRecordSource {
    fn name(&self) -> &str {
        "postgis"
    }

    async fn fetch_records(&self, bounds: &GeoBounds) -> Result<Vec<SourceRecord>, SourceError> {
        let records =
            with_backoff(&self.retry, "Parcel bounds query", || self.query_once(bounds)).await?;
        log::debug!(
            "Fetched {} parcels from PostGIS for bounds {bounds:?}",
            records.len()
        );
        Ok(records)
    }
}
