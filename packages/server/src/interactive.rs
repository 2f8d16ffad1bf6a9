//! Interactive mode for the server.
//!
//! Prompts for bind address, port, and record source before starting.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};

use crate::ServerError;
use crate::config::{DEFAULT_BIND_ADDR, DEFAULT_PORT, RecordSourceKind, ServerConfig};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Starts from [`ServerConfig::from_env`], lets the user override the
/// bind address, port, and record source, then delegates to
/// [`super::run_with_config`].
///
/// # Errors
///
/// Returns [`ServerError`] if the environment configuration is invalid or
/// the server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> Result<(), ServerError> {
    println!("Parcel Map Server");
    println!();

    let mut config = ServerConfig::from_env()?;

    config.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(config.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    config.port = Input::new()
        .with_prompt("Port")
        .default(config.port)
        .interact_text()
        .unwrap_or(DEFAULT_PORT);

    let kinds = [RecordSourceKind::Postgres, RecordSourceKind::Geojson];
    let labels = ["PostGIS database", "GeoJSON file"];
    let current = kinds
        .iter()
        .position(|k| *k == config.record_source)
        .unwrap_or(0);

    let selection = Select::new()
        .with_prompt("Record source")
        .items(&labels)
        .default(current)
        .interact_opt()
        .unwrap_or(None);

    let Some(selection) = selection else {
        println!("Cancelled.");
        return Ok(());
    };
    config.record_source = kinds[selection];

    if config.record_source == RecordSourceKind::Geojson {
        let path: String = Input::new()
            .with_prompt("GeoJSON path")
            .default(config.geojson_path.display().to_string())
            .interact_text()
            .unwrap_or_else(|_| config.geojson_path.display().to_string());
        config.geojson_path = PathBuf::from(path);
    }

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{} using {}?",
            config.bind_addr, config.port, config.record_source
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_with_config(config).await
}
