//! Offline density grid over a `GeoJSON` parcels file.

use std::path::{Path, PathBuf};

use dialoguer::{Input, Select};
use parcel_map_database::{GeoJsonRecordSource, RecordSource as _};
use parcel_map_grid::{AggregationOptions, DEFAULT_GRID_SIZE, GridSpec, aggregate};
use parcel_map_grid_models::DensityMetric;
use parcel_map_regions::RegionRegistry;
use parcel_map_server_models::ApiDensityGrid;

/// Everything needed for one offline grid run.
#[derive(Debug, Clone)]
pub struct GridArgs {
    pub region: String,
    pub grid_size: i64,
    pub geojson: PathBuf,
    pub density_by: DensityMetric,
}

/// Loads the built-in regions plus the optional extra regions file.
///
/// # Errors
///
/// Returns an error if the regions file cannot be read or is invalid.
pub fn load_regions(
    regions_file: Option<&Path>,
) -> Result<RegionRegistry, Box<dyn std::error::Error>> {
    let mut registry = RegionRegistry::builtin();
    if let Some(path) = regions_file {
        registry.extend_from_path(path)?;
    }
    Ok(registry)
}

/// Builds the density grid for `args` and returns it in the API's response
/// shape.
///
/// # Errors
///
/// Returns an error if the region is unknown, the grid size is out of
/// range, or the `GeoJSON` file cannot be loaded.
pub async fn build(
    regions: &RegionRegistry,
    args: &GridArgs,
) -> Result<ApiDensityGrid, Box<dyn std::error::Error>> {
    let region = regions
        .get(&args.region)
        .ok_or_else(|| format!("Unknown region: {}", args.region))?;
    GridSpec::new(region.bounds, args.grid_size)?;

    let source = GeoJsonRecordSource::open(&args.geojson).await?;
    let records = source.fetch_records(&region.bounds).await?;

    let options = AggregationOptions::default().with_density_metric(args.density_by);
    let result = aggregate(&region.bounds, args.grid_size, &records, &options)?;

    log::info!(
        "{}: {} records -> {} cells in {}ms",
        region.id,
        result.metadata.total_records,
        result.metadata.cell_count,
        result.metadata.processing_time_ms
    );

    Ok(ApiDensityGrid::new(region.id.clone(), result))
}

/// Runs the `grid` subcommand, printing the grid as JSON on stdout.
///
/// # Errors
///
/// See [`build`].
pub async fn run(
    regions: &RegionRegistry,
    args: &GridArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let grid = build(regions, args).await?;
    println!("{}", serde_json::to_string_pretty(&grid)?);
    Ok(())
}

/// Prompts for the grid arguments, then runs [`run`].
///
/// # Errors
///
/// Returns an error if a prompt fails or the grid cannot be built.
pub async fn interactive(regions: &RegionRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let ids: Vec<&str> = regions.iter().map(|r| r.id.as_str()).collect();
    if ids.is_empty() {
        return Err("No regions available".into());
    }

    let region_idx = Select::new()
        .with_prompt("Region")
        .items(&ids)
        .default(0)
        .interact()?;

    let grid_size: i64 = Input::new()
        .with_prompt("Grid size")
        .default(i64::from(DEFAULT_GRID_SIZE))
        .interact_text()?;

    let metrics = [DensityMetric::Units, DensityMetric::Records];
    let metric_idx = Select::new()
        .with_prompt("Density by")
        .items(&metrics)
        .default(0)
        .interact()?;

    let geojson: String = Input::new()
        .with_prompt("GeoJSON file")
        .default("data/parcels.geojson".to_string())
        .interact_text()?;

    let args = GridArgs {
        region: ids[region_idx].to_string(),
        grid_size,
        geojson: PathBuf::from(geojson),
        density_by: metrics[metric_idx],
    };

    run(regions, &args).await
}
