//! Cell-index arithmetic for laying a square grid over a region.

use parcel_map_grid_models::{CellIndex, GeoBounds};

use crate::GridError;

/// Smallest accepted grid dimension.
pub const MIN_GRID_SIZE: u32 = 1;

/// Largest accepted grid dimension. 500×500 is already a quarter million
/// potential cells, far beyond what a browser heatmap layer needs.
pub const MAX_GRID_SIZE: u32 = 500;

/// Grid dimension used when a caller does not ask for one.
pub const DEFAULT_GRID_SIZE: u32 = 50;

/// A validated `size × size` grid over a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    bounds: GeoBounds,
    size: u32,
    lat_step: f64,
    lng_step: f64,
}

impl GridSpec {
    /// Validates the bounds and grid size and precomputes the cell steps.
    ///
    /// # Errors
    ///
    /// * [`GridError::InvalidGridSize`] if `grid_size` is outside
    ///   [`MIN_GRID_SIZE`]..=[`MAX_GRID_SIZE`]
    /// * [`GridError::InvalidBounds`] if the bounds are degenerate
    pub fn new(bounds: GeoBounds, grid_size: i64) -> Result<Self, GridError> {
        let size = u32::try_from(grid_size)
            .ok()
            .filter(|s| (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(s))
            .ok_or(GridError::InvalidGridSize { value: grid_size })?;
        bounds.validate()?;

        Ok(Self {
            bounds,
            size,
            lat_step: bounds.lat_span() / f64::from(size),
            lng_step: bounds.lng_span() / f64::from(size),
        })
    }

    /// The region this grid covers.
    #[must_use]
    pub const fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    /// Number of cells along each axis.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Maps a point to its cell.
    ///
    /// Both axes are clamped into `[0, size - 1]`: points on the northern or
    /// eastern edge land in the last row/column, and points outside the
    /// region collapse onto the nearest edge cell.
    #[must_use]
    pub fn cell_index(&self, latitude: f64, longitude: f64) -> CellIndex {
        CellIndex::new(
            clamp_axis((longitude - self.bounds.west) / self.lng_step, self.size),
            clamp_axis((latitude - self.bounds.south) / self.lat_step, self.size),
        )
    }

    /// Rectangle covered by a cell.
    #[must_use]
    pub fn cell_bounds(&self, index: CellIndex) -> GeoBounds {
        let south = self.bounds.south + f64::from(index.y) * self.lat_step;
        let west = self.bounds.west + f64::from(index.x) * self.lng_step;
        GeoBounds::new(south, south + self.lat_step, west, west + self.lng_step)
    }

    /// `(latitude, longitude)` of a cell's center.
    #[must_use]
    pub fn cell_center(&self, index: CellIndex) -> (f64, f64) {
        (
            self.bounds.south + (f64::from(index.y) + 0.5) * self.lat_step,
            self.bounds.west + (f64::from(index.x) + 0.5) * self.lng_step,
        )
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_axis(fraction: f64, size: u32) -> u32 {
    let last = size - 1;
    let cell = fraction.floor();
    if cell.is_nan() || cell <= 0.0 {
        0
    } else if cell >= f64::from(last) {
        last
    } else {
        cell as u32
    }
}
