//! Record source over a fixed in-memory list.

use async_trait::async_trait;
use parcel_map_grid_models::{GeoBounds, SourceRecord};

use crate::{RecordSource, SourceError};

/// Serves a fixed list of records.
///
/// Unlike the other sources this one does not filter by bounds: every
/// record is returned as-is, including ones without coordinates, so tests
/// can exercise the aggregation's skip and clamp paths end to end.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    records: Vec<SourceRecord>,
}

impl MemoryRecordSource {
    /// Creates a source serving `records`.
    #[must_use]
    pub const fn new(records: Vec<SourceRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_records(&self, _bounds: &GeoBounds) -> Result<Vec<SourceRecord>, SourceError> {
        Ok(self.records.clone())
    }
}
