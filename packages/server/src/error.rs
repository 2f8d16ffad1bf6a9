//! Request-level failures and their HTTP mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use parcel_map_database::SourceError;
use parcel_map_grid::GridError;
use parcel_map_server_models::ApiError;

/// Everything that can make an API request fail.
#[derive(Debug, thiserror::Error)]
pub enum ApiFailure {
    /// A required query parameter is absent.
    #[error("Missing required parameter: {name}")]
    MissingParameter {
        /// Parameter name as it appears in the query string.
        name: &'static str,
    },

    /// No region with this id is registered.
    #[error("Unknown region: {id}")]
    UnknownRegion {
        /// Requested id.
        id: String,
    },

    /// A query parameter could not be parsed.
    #[error("Invalid {name}: {message}")]
    InvalidParameter {
        /// Parameter name as it appears in the query string.
        name: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// The grid configuration was rejected before fetching records.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// The record source failed.
    #[error("Record source failed: {0}")]
    RecordSource(#[from] SourceError),

    /// The aggregation task did not complete.
    #[error("Aggregation task failed: {message}")]
    Internal {
        /// Description of what went wrong.
        message: String,
    },
}

impl ResponseError for ApiFailure {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter { .. } | Self::InvalidParameter { .. } | Self::Grid(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UnknownRegion { .. } => StatusCode::NOT_FOUND,
            Self::RecordSource(_) => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiError::new(self.to_string()))
    }
}
