//! Finalizes accumulated cells into a sorted [`GridResult`].

use std::time::Duration;

use parcel_map_grid_models::{DensityMetric, GridCell, GridMetadata, GridResult};

use crate::aggregator::{CellAccumulator, CellMap};
use crate::binning::GridSpec;

/// Counters collected while binning, carried into the metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Every record seen.
    pub total_records: u64,
    /// Records dropped for missing or non-finite coordinates.
    pub skipped_records: u64,
}

/// Derives per-cell metrics, sorts cells hottest first and fills the
/// summary.
#[must_use]
pub fn assemble(
    spec: &GridSpec,
    cells: CellMap<'_>,
    metric: DensityMetric,
    stats: RunStats,
    elapsed: Duration,
) -> GridResult {
    let mut cells: Vec<GridCell> = cells
        .into_cells()
        .into_iter()
        .map(|(index, acc)| {
            let (center_lat, center_lng) = spec.cell_center(index);
            let rect = spec.cell_bounds(index);
            GridCell {
                x: index.x,
                y: index.y,
                center_lat,
                center_lng,
                south: rect.south,
                north: rect.north,
                west: rect.west,
                east: rect.east,
                record_count: acc.record_count,
                attribute_sum: acc.attribute_sum,
                average_attribute: average(&acc),
                category_count: acc.category_count,
                running_year_average: acc.running_year_average,
                density_score: density_score(&acc, metric),
            }
        })
        .collect();

    // Stable sort; ties keep (x, y) order from the cell map.
    cells.sort_by(|a, b| b.density_score.total_cmp(&a.density_score));

    let max_density = cells.first().map_or(0.0, |c| c.density_score);

    GridResult {
        metadata: GridMetadata {
            total_records: stats.total_records,
            skipped_records: stats.skipped_records,
            grid_size: spec.size(),
            cell_count: cells.len() as u64,
            max_density,
            density_metric: metric,
            processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            bounds: *spec.bounds(),
        },
        cells,
    }
}

#[allow(clippy::cast_precision_loss)]
fn average(acc: &CellAccumulator) -> f64 {
    if acc.record_count == 0 {
        return 0.0;
    }
    round1(acc.attribute_sum / acc.record_count as f64)
}

#[allow(clippy::cast_precision_loss)]
fn density_score(acc: &CellAccumulator, metric: DensityMetric) -> f64 {
    match metric {
        DensityMetric::Units => acc.attribute_sum,
        DensityMetric::Records => acc.record_count as f64,
    }
}

/// Rounds to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
