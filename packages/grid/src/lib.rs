#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Density grid aggregation.
//!
//! Bins an arbitrary number of geolocated records into a fixed `N × N` grid
//! laid over a region and computes per-cell statistics in a single pass, so
//! the map frontend can draw a heatmap from a few thousand cells instead of
//! tens of thousands of raw points.
//!
//! The pipeline is split the same way the data flows:
//!
//! * [`binning`] maps coordinates to clamped cell indices
//! * [`aggregator`] keeps O(1) running statistics per populated cell
//! * [`assemble`] finalizes cells, sorts them and builds the summary
//!
//! [`aggregate`] runs all three over an in-memory record sequence. Each call
//! owns its cell map, so concurrent calls never share mutable state.

pub mod aggregator;
pub mod assemble;
pub mod binning;

use std::time::Instant;

use parcel_map_grid_models::{GeoBounds, GridResult, InvalidBoundsError, SourceRecord};

pub use aggregator::AggregationOptions;
pub use binning::{DEFAULT_GRID_SIZE, GridSpec, MAX_GRID_SIZE, MIN_GRID_SIZE};

use crate::aggregator::CellMap;
use crate::assemble::{RunStats, assemble};

/// Errors raised before any record is binned.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Grid dimension outside the accepted range.
    #[error(
        "grid size {value} is outside the accepted range {min}-{max}",
        min = MIN_GRID_SIZE,
        max = MAX_GRID_SIZE
    )]
    InvalidGridSize {
        /// The rejected value.
        value: i64,
    },

    /// Region bounds are degenerate or out of range.
    #[error(transparent)]
    InvalidBounds(#[from] InvalidBoundsError),
}

/// Aggregates `records` into a `grid_size × grid_size` grid over `bounds`.
///
/// Records with missing or non-finite coordinates are counted in
/// `total_records` and `skipped_records` but land in no cell. Records
/// outside `bounds` are clamped into the nearest edge cell; callers that
/// want them excluded must filter beforehand.
///
/// # Errors
///
/// Returns [`GridError`] if `grid_size` is out of range or `bounds` is
/// invalid. Individual records never cause an error.
pub fn aggregate<'a, I>(
    bounds: &GeoBounds,
    grid_size: i64,
    records: I,
    options: &AggregationOptions,
) -> Result<GridResult, GridError>
where
    I: IntoIterator<Item = &'a SourceRecord>,
{
    let spec = GridSpec::new(*bounds, grid_size)?;
    let started = Instant::now();

    let mut cells = CellMap::new(options);
    let mut stats = RunStats::default();

    for record in records {
        stats.total_records += 1;
        let Some((lat, lng)) = record.coordinates() else {
            stats.skipped_records += 1;
            continue;
        };
        cells.record(spec.cell_index(lat, lng), record);
    }

    let result = assemble(
        &spec,
        cells,
        options.density_metric,
        stats,
        started.elapsed(),
    );

    log::debug!(
        "Aggregated {} records ({} skipped) into {} cells on a {}x{} grid in {}ms",
        result.metadata.total_records,
        result.metadata.skipped_records,
        result.metadata.cell_count,
        spec.size(),
        spec.size(),
        result.metadata.processing_time_ms,
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use parcel_map_grid_models::{CellIndex, DensityMetric, GridCell};

    use super::*;

    fn unit_bounds() -> GeoBounds {
        GeoBounds::new(0.0, 10.0, 0.0, 10.0)
    }

    fn options() -> AggregationOptions {
        AggregationOptions::for_year(2025)
    }

    fn cell(result: &GridResult, x: u32, y: u32) -> &GridCell {
        result
            .cells
            .iter()
            .find(|c| c.index() == CellIndex::new(x, y))
            .unwrap_or_else(|| panic!("no cell at ({x}, {y})"))
    }

    /// Deterministic pseudo-random points so property checks are repeatable.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn scattered_records(count: usize) -> Vec<SourceRecord> {
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..count)
            .map(|i| {
                // Spread slightly past the region so clamping is exercised.
                let lat = next().mul_add(12.0, -1.0);
                let lng = next().mul_add(12.0, -1.0);
                let year = 1780 + (next() * 260.0) as i32;
                let record = SourceRecord::at(lat, lng)
                    .with_units((next() * 20.0).floor())
                    .with_year_built(year);
                if i % 3 == 0 {
                    record.with_land_use("1_residential")
                } else {
                    record
                }
            })
            .collect()
    }

    #[test]
    fn two_by_two_scenario() {
        let records = [
            SourceRecord::at(1.0, 1.0).with_units(5.0),
            SourceRecord::at(9.0, 9.0).with_units(3.0),
            SourceRecord::at(1.0, 1.0).with_units(7.0),
        ];
        let result = aggregate(&unit_bounds(), 2, &records, &options()).unwrap();

        assert_eq!(result.cells.len(), 2);
        assert_eq!(result.metadata.cell_count, 2);
        assert_eq!(result.metadata.total_records, 3);
        assert!((result.metadata.max_density - 12.0).abs() < f64::EPSILON);

        let hot = cell(&result, 0, 0);
        assert_eq!(hot.record_count, 2);
        assert!((hot.attribute_sum - 12.0).abs() < f64::EPSILON);
        assert!((hot.average_attribute - 6.0).abs() < f64::EPSILON);
        assert!((hot.center_lat - 2.5).abs() < f64::EPSILON);
        assert!((hot.center_lng - 2.5).abs() < f64::EPSILON);

        let cold = cell(&result, 1, 1);
        assert_eq!(cold.record_count, 1);
        assert!((cold.attribute_sum - 3.0).abs() < f64::EPSILON);
        assert!((cold.average_attribute - 3.0).abs() < f64::EPSILON);

        assert_eq!(result.cells[0].index(), CellIndex::new(0, 0));
    }

    #[test]
    fn north_east_corner_is_binned_not_rejected() {
        let records = [SourceRecord::at(10.0, 10.0).with_units(1.0)];
        let result = aggregate(&unit_bounds(), 2, &records, &options()).unwrap();
        assert_eq!(result.cells.len(), 1);
        assert_eq!(result.cells[0].index(), CellIndex::new(1, 1));
    }

    #[test]
    fn empty_input_succeeds_with_no_cells() {
        let result = aggregate(&unit_bounds(), 10, &[], &options()).unwrap();
        assert!(result.cells.is_empty());
        assert_eq!(result.metadata.total_records, 0);
        assert_eq!(result.metadata.cell_count, 0);
        assert!(result.metadata.max_density.abs() < f64::EPSILON);
        assert_eq!(result.metadata.grid_size, 10);
        assert_eq!(result.metadata.bounds, unit_bounds());
    }

    #[test]
    fn invalid_grid_size_is_a_configuration_error() {
        let records = [SourceRecord::at(1.0, 1.0)];
        assert!(matches!(
            aggregate(&unit_bounds(), 0, &records, &options()),
            Err(GridError::InvalidGridSize { value: 0 })
        ));
        assert!(matches!(
            aggregate(&unit_bounds(), -3, &records, &options()),
            Err(GridError::InvalidGridSize { value: -3 })
        ));
    }

    #[test]
    fn records_without_coordinates_are_skipped() {
        let records = [
            SourceRecord::at(1.0, 1.0).with_units(2.0),
            SourceRecord {
                units: Some(100.0),
                ..SourceRecord::default()
            },
            SourceRecord::at(f64::NAN, 4.0).with_units(100.0),
            SourceRecord::at(3.0, f64::INFINITY).with_units(100.0),
        ];
        let result = aggregate(&unit_bounds(), 2, &records, &options()).unwrap();

        assert_eq!(result.metadata.total_records, 4);
        assert_eq!(result.metadata.skipped_records, 3);
        assert_eq!(result.cells.len(), 1);
        assert!((result.metadata.max_density - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn year_mean_within_a_grid_cell() {
        let records = [
            SourceRecord::at(1.0, 1.0).with_year_built(2000),
            SourceRecord::at(1.5, 1.5).with_year_built(2010),
            SourceRecord::at(2.0, 2.0).with_year_built(2020),
        ];
        let result = aggregate(&unit_bounds(), 2, &records, &options()).unwrap();
        assert_eq!(result.cells[0].running_year_average, Some(2010.0));
    }

    #[test]
    fn cells_stay_inside_the_grid() {
        let records = scattered_records(5_000);
        for size in [1, 2, 7, 50, 500] {
            let result = aggregate(&unit_bounds(), size, &records, &options()).unwrap();
            let size = u32::try_from(size).unwrap();
            for c in &result.cells {
                assert!(c.x < size && c.y < size, "({}, {}) outside {size}", c.x, c.y);
            }
        }
    }

    #[test]
    fn binned_counts_never_exceed_total() {
        let mut records = scattered_records(2_000);
        records.push(SourceRecord::default());
        let result = aggregate(&unit_bounds(), 25, &records, &options()).unwrap();

        let binned: u64 = result.cells.iter().map(|c| c.record_count).sum();
        assert_eq!(binned + 1, result.metadata.total_records);
        assert_eq!(result.metadata.skipped_records, 1);

        let records = scattered_records(2_000);
        let result = aggregate(&unit_bounds(), 25, &records, &options()).unwrap();
        let binned: u64 = result.cells.iter().map(|c| c.record_count).sum();
        assert_eq!(binned, result.metadata.total_records);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn averages_match_sums_within_rounding() {
        let records = scattered_records(3_000);
        let result = aggregate(&unit_bounds(), 13, &records, &options()).unwrap();
        for c in &result.cells {
            let count = c.record_count as f64;
            let tolerance = 0.05f64.mul_add(count, 1e-9);
            assert!(
                (c.average_attribute * count - c.attribute_sum).abs() <= tolerance,
                "cell ({}, {}): avg {} * {count} vs sum {}",
                c.x,
                c.y,
                c.average_attribute,
                c.attribute_sum
            );
        }
    }

    #[test]
    fn cells_are_sorted_by_density() {
        let records = scattered_records(3_000);
        let result = aggregate(&unit_bounds(), 20, &records, &options()).unwrap();
        assert!(
            result
                .cells
                .windows(2)
                .all(|w| w[0].density_score >= w[1].density_score)
        );
        assert!(
            (result.metadata.max_density - result.cells[0].density_score).abs() < f64::EPSILON
        );
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = scattered_records(4_000);
        let first = aggregate(&unit_bounds(), 30, &records, &options()).unwrap();
        let second = aggregate(&unit_bounds(), 30, &records, &options()).unwrap();
        assert_eq!(first.cells, second.cells);
        assert_eq!(first.metadata.cell_count, second.metadata.cell_count);
    }

    #[test]
    fn density_metric_is_reported() {
        let records = [SourceRecord::at(1.0, 1.0).with_units(9.0)];
        let opts = options().with_density_metric(DensityMetric::Records);
        let result = aggregate(&unit_bounds(), 2, &records, &opts).unwrap();
        assert_eq!(result.metadata.density_metric, DensityMetric::Records);
        assert!((result.cells[0].density_score - 1.0).abs() < f64::EPSILON);
    }
}
