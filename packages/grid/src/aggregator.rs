//! Per-cell running statistics.
//!
//! Each populated cell owns a [`CellAccumulator`] that is updated in O(1)
//! for every record binned into it. Nothing is ever removed or corrected
//! once added.

use std::collections::BTreeMap;

use chrono::Datelike as _;
use parcel_map_grid_models::{CellIndex, DensityMetric, SourceRecord};

/// Construction years must be strictly after this to enter the running mean.
pub const EARLIEST_YEAR_EXCLUSIVE: i32 = 1800;

/// Use keyword counted into `category_count` by default.
pub const DEFAULT_CATEGORY_KEYWORD: &str = "residential";

/// Tunables for one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationOptions {
    /// Case-insensitive substring matched against a record's use label.
    /// An empty keyword matches nothing.
    pub category_keyword: String,
    /// Years `<=` this value are ignored by the running mean.
    pub earliest_year_exclusive: i32,
    /// Years `>` this value are ignored by the running mean.
    pub current_year: i32,
    /// Quantity used as each cell's density score.
    pub density_metric: DensityMetric,
}

impl AggregationOptions {
    /// Default options with an explicit current year.
    #[must_use]
    pub fn for_year(current_year: i32) -> Self {
        Self {
            category_keyword: DEFAULT_CATEGORY_KEYWORD.to_string(),
            earliest_year_exclusive: EARLIEST_YEAR_EXCLUSIVE,
            current_year,
            density_metric: DensityMetric::default(),
        }
    }

    /// Replaces the density metric.
    #[must_use]
    pub const fn with_density_metric(mut self, metric: DensityMetric) -> Self {
        self.density_metric = metric;
        self
    }

    fn accepts_year(&self, year: i32) -> bool {
        year > self.earliest_year_exclusive && year <= self.current_year
    }
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self::for_year(chrono::Utc::now().year())
    }
}

/// Running statistics for one cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellAccumulator {
    /// Records binned so far.
    pub record_count: u64,
    /// Sum of unit counts (missing or non-finite counted as zero).
    pub attribute_sum: f64,
    /// Records whose use label matched the keyword.
    pub category_count: u64,
    /// Running mean of accepted construction years.
    pub running_year_average: Option<f64>,
}

impl CellAccumulator {
    /// Folds one record into the cell.
    ///
    /// The year mean divides by `record_count` *after* it has been bumped
    /// for this record.
    #[allow(clippy::cast_precision_loss)]
    fn add(&mut self, record: &SourceRecord, keyword: &str, options: &AggregationOptions) {
        self.record_count += 1;

        self.attribute_sum += record.units.filter(|u| u.is_finite()).unwrap_or(0.0);

        if !keyword.is_empty()
            && record
                .land_use
                .as_deref()
                .is_some_and(|u| u.to_lowercase().contains(keyword))
        {
            self.category_count += 1;
        }

        if let Some(year) = record.year_built.filter(|y| options.accepts_year(*y)) {
            let value = f64::from(year);
            self.running_year_average = Some(match self.running_year_average {
                Some(avg) => avg + (value - avg) / self.record_count as f64,
                None => value,
            });
        }
    }
}

/// Sparse map of populated cells for a single run.
#[derive(Debug)]
pub struct CellMap<'a> {
    options: &'a AggregationOptions,
    keyword: String,
    cells: BTreeMap<CellIndex, CellAccumulator>,
}

impl<'a> CellMap<'a> {
    /// Creates an empty cell map.
    #[must_use]
    pub fn new(options: &'a AggregationOptions) -> Self {
        Self {
            options,
            keyword: options.category_keyword.to_lowercase(),
            cells: BTreeMap::new(),
        }
    }

    /// Adds a record to the cell at `index`, creating the cell on first use.
    pub fn record(&mut self, index: CellIndex, record: &SourceRecord) {
        self.cells
            .entry(index)
            .or_default()
            .add(record, &self.keyword, self.options);
    }

    /// Number of populated cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell has been populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Looks up a cell's running statistics.
    #[must_use]
    pub fn get(&self, index: CellIndex) -> Option<&CellAccumulator> {
        self.cells.get(&index)
    }

    /// Consumes the map, yielding cells in `(x, y)` order.
    #[must_use]
    pub fn into_cells(self) -> BTreeMap<CellIndex, CellAccumulator> {
        self.cells
    }
}
