#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the parcel map API server.

#[actix_web::main]
async fn main() -> Result<(), parcel_map_server::ServerError> {
    parcel_map_server::run_server().await
}
