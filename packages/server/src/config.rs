//! Server configuration read from environment variables.

use std::path::PathBuf;

use parcel_map_database::db::DEFAULT_DATABASE_URL;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::ServerError;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default location of the parcels file for the `GeoJSON` record source.
pub const DEFAULT_GEOJSON_PATH: &str = "data/parcels.geojson";

/// Which record source feeds the density grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RecordSourceKind {
    /// `parcels` table in `PostGIS`.
    #[default]
    Postgres,
    /// Cadastral `GeoJSON` file loaded at startup.
    Geojson,
}

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// TCP port (`PORT`).
    pub port: u16,
    /// Record source (`PARCEL_MAP_RECORD_SOURCE`).
    pub record_source: RecordSourceKind,
    /// Connection string for [`RecordSourceKind::Postgres`] (`DATABASE_URL`).
    pub database_url: String,
    /// File for [`RecordSourceKind::Geojson`] (`PARCEL_MAP_GEOJSON_PATH`).
    pub geojson_path: PathBuf,
    /// Extra regions merged over the built-in ones (`PARCEL_MAP_REGIONS_PATH`).
    pub regions_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            record_source: RecordSourceKind::default(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            geojson_path: PathBuf::from(DEFAULT_GEOJSON_PATH),
            regions_path: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if `PARCEL_MAP_RECORD_SOURCE` names
    /// an unknown source.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Unset or empty keys fall back to defaults. An unparseable `PORT`
    /// falls back to [`DEFAULT_PORT`] with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if `PARCEL_MAP_RECORD_SOURCE` names
    /// an unknown source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(p) => p.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid PORT '{p}', using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            None => defaults.port,
        };

        let record_source = match get("PARCEL_MAP_RECORD_SOURCE") {
            Some(kind) => kind.trim().parse().map_err(|_| ServerError::Config {
                message: format!(
                    "PARCEL_MAP_RECORD_SOURCE must be 'postgres' or 'geojson', got '{kind}'"
                ),
            })?,
            None => defaults.record_source,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
            record_source,
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            geojson_path: get("PARCEL_MAP_GEOJSON_PATH").map_or(defaults.geojson_path, PathBuf::from),
            regions_path: get("PARCEL_MAP_REGIONS_PATH").map(PathBuf::from),
        })
    }
}
