//! Record source backed by a cadastral `GeoJSON` file.
//!
//! The file is parsed once when the source is opened. Each feature becomes
//! one [`SourceRecord`]: point geometries use their coordinates, polygons
//! use their centroid. Feature properties are decoded into an explicit
//! [`ParcelProperties`] schema; a feature whose properties do not fit it is
//! quarantined (counted and logged) rather than coerced into defaults.

use std::path::Path;

use async_trait::async_trait;
use geo::Centroid as _;
use geojson::{Feature, GeoJson};
use parcel_map_grid_models::{GeoBounds, SourceRecord};
use serde::Deserialize;

use crate::{RecordSource, SourceError};

/// Number of quarantined features logged individually before going quiet.
const QUARANTINE_LOG_LIMIT: usize = 10;

/// Feature properties the density grid understands.
///
/// Accepts both the project's own export names and the INSPIRE cadastral
/// building names (`numberOfDwellings`, `beginning`, `currentUse`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParcelProperties {
    #[serde(default, alias = "numberOfDwellings")]
    units: Option<NumberOrText>,
    #[serde(default, alias = "beginning")]
    year_built: Option<NumberOrText>,
    #[serde(default, alias = "use")]
    current_use: Option<String>,
}

/// Numeric properties sometimes arrive as strings in cadastral exports.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Reads a year from a number or the leading `YYYY` of a date string.
    #[allow(clippy::cast_possible_truncation)]
    fn as_year(&self) -> Option<i32> {
        match self {
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                i32::try_from(*n as i64).ok()
            }
            Self::Number(_) => None,
            Self::Text(s) => s.trim().get(..4).and_then(|y| y.parse().ok()),
        }
    }
}

/// In-memory record source built from a `GeoJSON` document.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonRecordSource {
    records: Vec<SourceRecord>,
    quarantined: usize,
}

impl GeoJsonRecordSource {
    /// Reads and parses a `GeoJSON` file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or is not a
    /// `FeatureCollection` or `Feature`.
    pub async fn open(path: &Path) -> Result<Self, SourceError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let source = Self::from_geojson_str(&contents)?;
        log::info!(
            "Loaded {} parcel records from {} ({} quarantined)",
            source.records.len(),
            path.display(),
            source.quarantined
        );
        Ok(source)
    }

    /// Parses a `GeoJSON` document.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the text is not valid `GeoJSON` or is a
    /// bare geometry.
    pub fn from_geojson_str(contents: &str) -> Result<Self, SourceError> {
        let features = match contents.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(SourceError::Conversion {
                    message: "Expected a FeatureCollection or Feature, found a bare geometry"
                        .to_string(),
                });
            }
        };

        let mut source = Self::default();
        for (position, feature) in features.into_iter().enumerate() {
            match decode_feature(feature) {
                Ok(record) => source.records.push(record),
                Err(reason) => {
                    source.quarantined += 1;
                    if source.quarantined <= QUARANTINE_LOG_LIMIT {
                        log::warn!("Quarantined feature #{position}: {reason}");
                    }
                }
            }
        }

        if source.quarantined > QUARANTINE_LOG_LIMIT {
            log::warn!(
                "{} features quarantined in total",
                source.quarantined
            );
        }

        Ok(source)
    }

    /// Every decoded record, including ones without geometry.
    #[must_use]
    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    /// Number of features rejected for malformed properties.
    #[must_use]
    pub const fn quarantined(&self) -> usize {
        self.quarantined
    }
}

#[async_trait]
impl RecordSource for GeoJsonRecordSource {
    fn name(&self) -> &str {
        "geojson"
    }

    async fn fetch_records(&self, bounds: &GeoBounds) -> Result<Vec<SourceRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|r| {
                r.coordinates()
                    .is_some_and(|(lat, lng)| bounds.contains(lat, lng))
            })
            .cloned()
            .collect())
    }
}

/// Converts one feature into a record, or explains why it was rejected.
fn decode_feature(feature: Feature) -> Result<SourceRecord, String> {
    let properties = match feature.properties {
        Some(props) => serde_json::from_value::<ParcelProperties>(serde_json::Value::Object(props))
            .map_err(|e| format!("properties do not match the parcel schema: {e}"))?,
        None => ParcelProperties::default(),
    };

    let units = match &properties.units {
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => {
            log::debug!("Blank units treated as missing");
            None
        }
        Some(value) => Some(
            value
                .as_f64()
                .ok_or_else(|| format!("units is not numeric: {value:?}"))?,
        ),
        None => None,
    };

    // An unreadable year only keeps the record out of the year mean.
    let year_built = properties.year_built.as_ref().and_then(|value| {
        let year = value.as_year();
        if year.is_none() {
            log::debug!("Ignoring unreadable year {value:?}");
        }
        year
    });

    let point = feature.geometry.and_then(|geometry| {
        let geometry: geo::Geometry<f64> = geometry.try_into().ok()?;
        geometry.centroid()
    });

    Ok(SourceRecord {
        latitude: point.map(|p| p.y()),
        longitude: point.map(|p| p.x()),
        units,
        year_built,
        land_use: properties.current_use,
    })
}
