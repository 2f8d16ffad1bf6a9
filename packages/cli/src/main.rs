#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the parcel map toolchain.
//!
//! With a subcommand it runs that tool directly; without one it opens an
//! interactive menu.

mod grid;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::Select;
use parcel_map_grid::DEFAULT_GRID_SIZE;
use parcel_map_grid_models::DensityMetric;
use parcel_map_regions::RegionRegistry;
use parcel_map_server::config::ServerConfig;

use crate::grid::GridArgs;

#[derive(Parser)]
#[command(name = "parcel_map_cli", about = "Parcel density map toolchain")]
struct Cli {
    /// Extra regions TOML merged over the built-in regions
    #[arg(long, global = true)]
    regions_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server (configured from the environment)
    Serve,
    /// List the available regions
    Regions,
    /// Build a density grid from a `GeoJSON` parcels file and print it as JSON
    Grid {
        /// Region id
        #[arg(long)]
        region: String,
        /// Cells per axis (1-500)
        #[arg(long, default_value_t = i64::from(DEFAULT_GRID_SIZE), allow_negative_numbers = true)]
        grid_size: i64,
        /// `GeoJSON` `FeatureCollection` of parcels
        #[arg(long)]
        geojson: PathBuf,
        /// Ranking metric: `units` or `records`
        #[arg(long, default_value_t = DensityMetric::Units)]
        density_by: DensityMetric,
    },
}

/// Top-level tool selection for the interactive menu.
enum Tool {
    Server,
    Regions,
    Grid,
}

impl Tool {
    const ALL: &[Self] = &[Self::Server, Self::Regions, Self::Grid];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Server => "Start server",
            Self::Regions => "List regions",
            Self::Grid => "Build density grid from GeoJSON",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => serve(false).await?,
        Some(Commands::Regions) => {
            let regions = grid::load_regions(cli.regions_file.as_deref())?;
            print_regions(&regions);
        }
        Some(Commands::Grid {
            region,
            grid_size,
            geojson,
            density_by,
        }) => {
            let regions = grid::load_regions(cli.regions_file.as_deref())?;
            let args = GridArgs {
                region,
                grid_size,
                geojson,
                density_by,
            };
            grid::run(&regions, &args).await?;
        }
        None => {
            println!("Parcel Map Toolchain");
            println!();

            let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

            let idx = Select::new()
                .with_prompt("What would you like to do?")
                .items(&labels)
                .default(0)
                .interact()?;

            match Tool::ALL[idx] {
                Tool::Server => serve(true).await?,
                Tool::Regions => {
                    let regions = grid::load_regions(cli.regions_file.as_deref())?;
                    print_regions(&regions);
                }
                Tool::Grid => {
                    let regions = grid::load_regions(cli.regions_file.as_deref())?;
                    grid::interactive(&regions).await?;
                }
            }
        }
    }

    Ok(())
}

async fn serve(interactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    // The server uses actix-web's runtime, so we need to run it
    // in a blocking task to avoid nesting tokio runtimes.
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(async move {
            if interactive {
                parcel_map_server::interactive::run().await
            } else {
                match ServerConfig::from_env() {
                    Ok(config) => parcel_map_server::run_with_config(config).await,
                    Err(e) => Err(e),
                }
            }
        })
    })
    .await??;

    Ok(())
}

fn print_regions(regions: &RegionRegistry) {
    for region in regions.iter() {
        let b = &region.bounds;
        println!(
            "{:<12} {:<20} {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
            region.id, region.name, b.south, b.north, b.west, b.east
        );
    }
}
