#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the parcel map dashboard.
//!
//! Serves density grids over cadastral parcel records. Each request names a
//! region from the registry; the server fetches that region's records from
//! the configured [`RecordSource`] and bins them into a square grid.

pub mod config;
pub mod error;
mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use parcel_map_database::{
    GeoJsonRecordSource, PostgisRecordSource, RecordSource, SourceError, db,
};
use parcel_map_regions::{RegionError, RegionRegistry};

use crate::config::{RecordSourceKind, ServerConfig};

/// Errors that can occur while starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Environment configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The record source could not be initialised.
    #[error("Record source error: {0}")]
    Source(#[from] SourceError),

    /// The region registry could not be loaded.
    #[error("Region error: {0}")]
    Regions(#[from] RegionError),

    /// The HTTP server failed to bind or run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Regions a density grid can be requested for.
    pub regions: Arc<RegionRegistry>,
    /// Where parcel records come from.
    pub records: Arc<dyn RecordSource>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/regions", web::get().to(handlers::regions))
            .route("/density-grid", web::get().to(handlers::density_grid)),
    );
}

/// Builds the region registry: the built-in regions plus, if configured,
/// the regions file on top.
///
/// # Errors
///
/// Returns [`RegionError`] if the regions file cannot be read or is invalid.
pub fn build_regions(config: &ServerConfig) -> Result<RegionRegistry, RegionError> {
    let mut registry = RegionRegistry::builtin();
    if let Some(path) = &config.regions_path {
        registry.extend_from_path(path)?;
    }
    Ok(registry)
}

/// Creates the configured record source.
///
/// # Errors
///
/// Returns [`SourceError`] if the database connection fails or the
/// `GeoJSON` file cannot be loaded.
pub async fn build_record_source(
    config: &ServerConfig,
) -> Result<Arc<dyn RecordSource>, SourceError> {
    let source: Arc<dyn RecordSource> = match config.record_source {
        RecordSourceKind::Postgres => {
            log::info!("Connecting to database...");
            let db_conn = db::connect(&config.database_url).await?;
            Arc::new(PostgisRecordSource::new(Arc::from(db_conn)))
        }
        RecordSourceKind::Geojson => {
            log::info!("Loading parcels from {}...", config.geojson_path.display());
            Arc::new(GeoJsonRecordSource::open(&config.geojson_path).await?)
        }
    };
    Ok(source)
}

/// Starts the parcel map API server with configuration read from the
/// environment.
///
/// Initialises logging, then delegates to [`run_with_config`]. The caller
/// provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if the configuration is invalid, the record
/// source or regions cannot be loaded, or the HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env()?;
    run_with_config(config).await
}

/// Starts the parcel map API server with an explicit configuration.
///
/// # Errors
///
/// Returns [`ServerError`] if the record source or regions cannot be
/// loaded, or the HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_with_config(config: ServerConfig) -> Result<(), ServerError> {
    let regions = build_regions(&config)?;
    log::info!("{} regions available", regions.len());

    let records = build_record_source(&config).await?;
    log::info!("Using {} record source", records.name());

    let state = web::Data::new(AppState {
        regions: Arc::new(regions),
        records,
    });

    let ServerConfig {
        bind_addr, port, ..
    } = config;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
