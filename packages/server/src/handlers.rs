//! HTTP handler functions for the parcel map API.

use actix_web::{HttpResponse, web};
use parcel_map_grid::{AggregationOptions, DEFAULT_GRID_SIZE, GridSpec, aggregate};
use parcel_map_grid_models::{DensityMetric, GeoBounds};
use parcel_map_server_models::{ApiDensityGrid, ApiHealth, ApiRegion, DensityGridQueryParams};

use crate::AppState;
use crate::error::ApiFailure;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/regions`
///
/// Lists every region a density grid can be requested for.
pub async fn regions(state: web::Data<AppState>) -> HttpResponse {
    let regions: Vec<ApiRegion> = state
        .regions
        .iter()
        .map(|r| ApiRegion {
            id: r.id.clone(),
            name: r.name.clone(),
            country: r.country.clone(),
            bounds: r.bounds,
        })
        .collect();

    HttpResponse::Ok().json(regions)
}

/// A density grid request that passed validation.
#[derive(Debug)]
struct GridRequest {
    region: String,
    bounds: GeoBounds,
    grid_size: i64,
    metric: DensityMetric,
}

/// `GET /api/density-grid?region=valencia&gridSize=50&densityBy=units`
///
/// Validates the request, fetches the region's records, and bins them into
/// a `gridSize × gridSize` grid. Configuration errors are reported before
/// the record source is touched.
///
/// # Errors
///
/// Returns [`ApiFailure`] for bad parameters (400), an unknown region
/// (404), or a record-source failure (502).
pub async fn density_grid(
    state: web::Data<AppState>,
    params: web::Query<DensityGridQueryParams>,
) -> Result<HttpResponse, ApiFailure> {
    let request = validate(&state, &params)?;

    let records = state
        .records
        .fetch_records(&request.bounds)
        .await
        .inspect_err(|e| {
            log::error!(
                "Failed to fetch records for region {} from {}: {e}",
                request.region,
                state.records.name()
            );
        })?;

    let options = AggregationOptions::default().with_density_metric(request.metric);
    let bounds = request.bounds;
    let grid_size = request.grid_size;
    let result = web::block(move || aggregate(&bounds, grid_size, &records, &options))
        .await
        .map_err(|e| ApiFailure::Internal {
            message: e.to_string(),
        })??;

    log::info!(
        "Density grid for {}: {} records -> {} cells ({}x{}) in {}ms",
        request.region,
        result.metadata.total_records,
        result.metadata.cell_count,
        result.metadata.grid_size,
        result.metadata.grid_size,
        result.metadata.processing_time_ms,
    );

    Ok(HttpResponse::Ok().json(ApiDensityGrid::new(request.region, result)))
}

fn validate(state: &AppState, params: &DensityGridQueryParams) -> Result<GridRequest, ApiFailure> {
    let id = params
        .region
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiFailure::MissingParameter { name: "region" })?;

    let region = state
        .regions
        .get(id)
        .ok_or_else(|| ApiFailure::UnknownRegion { id: id.to_string() })?;

    let grid_size = match params.grid_size.as_deref().map(str::trim) {
        None | Some("") => i64::from(DEFAULT_GRID_SIZE),
        Some(raw) => raw.parse().map_err(|_| ApiFailure::InvalidParameter {
            name: "gridSize",
            message: format!("'{raw}' is not an integer"),
        })?,
    };
    GridSpec::new(region.bounds, grid_size)?;

    let metric = match params.density_by.as_deref().map(str::trim) {
        None | Some("") => DensityMetric::default(),
        Some(raw) => raw.parse().map_err(|_| ApiFailure::InvalidParameter {
            name: "densityBy",
            message: format!("'{raw}' is not one of 'units', 'records'"),
        })?,
    };

    Ok(GridRequest {
        region: region.id.clone(),
        bounds: region.bounds,
        grid_size,
        metric,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use async_trait::async_trait;
    use parcel_map_database::{MemoryRecordSource, RecordSource, SourceError};
    use parcel_map_grid_models::SourceRecord;
    use parcel_map_regions::{RegionDefinition, RegionRegistry};
    use serde_json::Value;

    use super::*;
    use crate::configure;

    /// Record source that fails every fetch and counts calls.
    #[derive(Default)]
    struct FailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch_records(
            &self,
            _bounds: &GeoBounds,
        ) -> Result<Vec<SourceRecord>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SourceError::Connection {
                message: "upstream unavailable".to_string(),
            })
        }
    }

    fn square_regions() -> RegionRegistry {
        RegionRegistry::from_definitions([RegionDefinition {
            id: "square".to_string(),
            name: "Square".to_string(),
            country: None,
            bounds: GeoBounds::new(0.0, 10.0, 0.0, 10.0),
        }])
        .unwrap()
    }

    fn scenario_state() -> AppState {
        AppState {
            regions: Arc::new(square_regions()),
            records: Arc::new(MemoryRecordSource::new(vec![
                SourceRecord::at(1.0, 1.0).with_units(5.0),
                SourceRecord::at(9.0, 9.0).with_units(3.0),
                SourceRecord::at(1.0, 1.0).with_units(7.0),
            ])),
        }
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let (status, body) = get(scenario_state(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn regions_lists_registry() {
        let state = AppState {
            regions: Arc::new(RegionRegistry::builtin()),
            records: Arc::new(MemoryRecordSource::default()),
        };
        let (status, body) = get(state, "/api/regions").await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["id"].as_str())
            .collect();
        assert!(ids.contains(&"valencia"));
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[actix_web::test]
    async fn density_grid_scenario() {
        let (status, body) = get(scenario_state(), "/api/density-grid?region=square&gridSize=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["region"], "square");

        let cells = body["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0]["x"], 0);
        assert_eq!(cells[0]["y"], 0);
        assert_eq!(cells[0]["recordCount"], 2);
        assert_eq!(cells[0]["attributeSum"], 12.0);
        assert_eq!(cells[0]["averageAttribute"], 6.0);
        assert_eq!(cells[1]["x"], 1);
        assert_eq!(cells[1]["y"], 1);
        assert_eq!(cells[1]["averageAttribute"], 3.0);

        let meta = &body["metadata"];
        assert_eq!(meta["totalRecords"], 3);
        assert_eq!(meta["gridSize"], 2);
        assert_eq!(meta["cellCount"], 2);
        assert_eq!(meta["maxDensity"], 12.0);
        assert_eq!(meta["bounds"]["north"], 10.0);
    }

    #[actix_web::test]
    async fn density_grid_by_records() {
        let (status, body) = get(
            scenario_state(),
            "/api/density-grid?region=SQUARE&gridSize=2&densityBy=records",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metadata"]["densityBy"], "records");
        assert_eq!(body["metadata"]["maxDensity"], 2.0);
    }

    #[actix_web::test]
    async fn default_grid_size_is_applied() {
        let (status, body) = get(scenario_state(), "/api/density-grid?region=square").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metadata"]["gridSize"], DEFAULT_GRID_SIZE);
    }

    #[actix_web::test]
    async fn empty_region_is_not_an_error() {
        let state = AppState {
            regions: Arc::new(square_regions()),
            records: Arc::new(MemoryRecordSource::default()),
        };
        let (status, body) = get(state, "/api/density-grid?region=square&gridSize=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cells"].as_array().unwrap().len(), 0);
        assert_eq!(body["metadata"]["cellCount"], 0);
        assert_eq!(body["metadata"]["maxDensity"], 0.0);
    }

    #[actix_web::test]
    async fn missing_region_is_bad_request() {
        let (status, body) = get(scenario_state(), "/api/density-grid?gridSize=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("region"));
    }

    #[actix_web::test]
    async fn unknown_region_is_not_found() {
        let (status, body) = get(scenario_state(), "/api/density-grid?region=atlantis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Unknown region: atlantis");
    }

    #[actix_web::test]
    async fn out_of_range_grid_sizes_are_bad_requests() {
        for size in ["0", "-4", "501", "ten"] {
            let (status, body) = get(
                scenario_state(),
                &format!("/api/density-grid?region=square&gridSize={size}"),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "gridSize={size}");
            assert_eq!(body["success"], false);
        }
    }

    #[actix_web::test]
    async fn unknown_density_metric_is_bad_request() {
        let (status, _) = get(
            scenario_state(),
            "/api/density-grid?region=square&densityBy=area",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn source_failure_is_bad_gateway() {
        let source = Arc::new(FailingSource::default());
        let state = AppState {
            regions: Arc::new(square_regions()),
            records: source.clone(),
        };
        let (status, body) = get(state, "/api/density-grid?region=square&gridSize=4").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("upstream unavailable"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn configuration_errors_skip_the_fetch() {
        let source = Arc::new(FailingSource::default());
        let state = AppState {
            regions: Arc::new(square_regions()),
            records: source.clone(),
        };
        let (status, _) = get(state, "/api/density-grid?region=square&gridSize=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
