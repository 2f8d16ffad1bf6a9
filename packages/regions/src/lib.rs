#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Registry of named map regions.
//!
//! Each built-in region is a `.toml` file in `packages/regions/regions/`
//! baked into the binary with [`include_str!`]. Deployments can layer extra
//! regions (or override built-in bounds) from a TOML file containing a
//! `[[regions]]` array.
//!
//! A [`RegionRegistry`] is built once at startup and only read afterwards,
//! so it can be shared between request handlers without locking.

use std::collections::BTreeMap;
use std::path::Path;

use parcel_map_grid_models::{GeoBounds, InvalidBoundsError};
use serde::Deserialize;

/// Number of embedded regions. Enforced by a test.
#[cfg(test)]
const EXPECTED_REGION_COUNT: usize = 6;

/// Embedded TOML region definitions.
const REGION_TOMLS: &[(&str, &str)] = &[
    ("alicante", include_str!("../regions/alicante.toml")),
    ("barcelona", include_str!("../regions/barcelona.toml")),
    ("madrid", include_str!("../regions/madrid.toml")),
    ("malaga", include_str!("../regions/malaga.toml")),
    ("sevilla", include_str!("../regions/sevilla.toml")),
    ("valencia", include_str!("../regions/valencia.toml")),
];

/// Errors that can occur while building a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    /// TOML could not be parsed into region definitions.
    #[error("Failed to parse region definitions: {0}")]
    Parse(#[from] toml::de::Error),

    /// A region's bounds break the ordering or range rules.
    #[error("Region '{id}' has {source}")]
    InvalidBounds {
        /// Region identifier.
        id: String,
        /// Underlying validation failure.
        source: InvalidBoundsError,
    },

    /// Two definitions in the same batch share an id.
    #[error("Duplicate region id: {id}")]
    Duplicate {
        /// Region identifier.
        id: String,
    },

    /// Region file could not be read.
    #[error("Failed to read region file: {0}")]
    Io(#[from] std::io::Error),
}

/// A named rectangular region the density grid can be laid over.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionDefinition {
    /// Lookup key (e.g. `"valencia"`). Stored lowercase.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default)]
    pub country: Option<String>,
    /// Region extent.
    pub bounds: GeoBounds,
}

/// Shape of an external regions file.
#[derive(Debug, Deserialize)]
struct RegionFile {
    #[serde(default)]
    regions: Vec<RegionDefinition>,
}

/// Read-only lookup table of regions keyed by id.
#[derive(Debug, Clone, Default)]
pub struct RegionRegistry {
    regions: BTreeMap<String, RegionDefinition>,
}

impl RegionRegistry {
    /// Builds a registry from the embedded region files.
    ///
    /// # Panics
    ///
    /// Panics if any embedded TOML file fails to parse or validate. Since
    /// these are compile-time constants, a failure is a development error
    /// caught by the tests below.
    #[must_use]
    pub fn builtin() -> Self {
        let definitions = REGION_TOMLS.iter().map(|(name, toml_str)| {
            toml::de::from_str::<RegionDefinition>(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse region '{name}': {e}"))
        });

        Self::from_definitions(definitions)
            .unwrap_or_else(|e| panic!("Invalid built-in region: {e}"))
    }

    /// Builds a registry from explicit definitions.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] if any bounds are invalid or an id repeats.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = RegionDefinition>,
    ) -> Result<Self, RegionError> {
        let mut registry = Self::default();
        for definition in definitions {
            let definition = validated(definition)?;
            if registry.regions.contains_key(&definition.id) {
                return Err(RegionError::Duplicate { id: definition.id });
            }
            registry.regions.insert(definition.id.clone(), definition);
        }
        Ok(registry)
    }

    /// Merges the `[[regions]]` of a TOML document into the registry.
    /// Entries replace built-in regions with the same id.
    ///
    /// Returns the number of regions merged.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] if the document does not parse, any bounds
    /// are invalid, or the document repeats an id. Nothing is merged on
    /// error.
    pub fn extend_from_toml_str(&mut self, toml_str: &str) -> Result<usize, RegionError> {
        let file: RegionFile = toml::de::from_str(toml_str)?;
        let incoming = Self::from_definitions(file.regions)?;
        let count = incoming.len();

        for (id, definition) in incoming.regions {
            if self.regions.insert(id.clone(), definition).is_some() {
                log::info!("Region '{id}' overridden by external definition");
            }
        }

        Ok(count)
    }

    /// Reads a regions file and merges it, see
    /// [`RegionRegistry::extend_from_toml_str`].
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] if the file cannot be read or is invalid.
    pub fn extend_from_path(&mut self, path: &Path) -> Result<usize, RegionError> {
        let contents = std::fs::read_to_string(path)?;
        let count = self.extend_from_toml_str(&contents)?;
        log::info!("Loaded {count} regions from {}", path.display());
        Ok(count)
    }

    /// Looks up a region by id, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RegionDefinition> {
        self.regions.get(&id.trim().to_lowercase())
    }

    /// All regions, sorted by id.
    pub fn iter(&self) -> impl Iterator<Item = &RegionDefinition> {
        self.regions.values()
    }

    /// Number of registered regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the registry has no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn validated(mut definition: RegionDefinition) -> Result<RegionDefinition, RegionError> {
    definition.id = definition.id.trim().to_lowercase();
    definition
        .bounds
        .validate()
        .map_err(|source| RegionError::InvalidBounds {
            id: definition.id.clone(),
            source,
        })?;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn loads_all_regions() {
        let registry = RegionRegistry::builtin();
        assert_eq!(
            registry.len(),
            EXPECTED_REGION_COUNT,
            "Expected {EXPECTED_REGION_COUNT} regions, found {}. \
             Update EXPECTED_REGION_COUNT after adding/removing regions.",
            registry.len()
        );
    }

    #[test]
    fn region_ids_match_file_names() {
        let registry = RegionRegistry::builtin();
        let ids: BTreeSet<&str> = registry.iter().map(|r| r.id.as_str()).collect();
        let names: BTreeSet<&str> = REGION_TOMLS.iter().map(|(name, _)| *name).collect();
        assert_eq!(ids, names);
    }

    #[test]
    fn all_regions_have_required_fields() {
        for region in RegionRegistry::builtin().iter() {
            assert!(!region.name.is_empty(), "Region {} has empty name", region.id);
            assert!(
                region.country.as_deref().is_some_and(|c| c.len() == 2),
                "Region {} has invalid country: {:?}",
                region.id,
                region.country
            );
            assert!(region.bounds.validate().is_ok());
        }
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let registry = RegionRegistry::builtin();
        assert!(registry.get("valencia").is_some());
        assert!(registry.get(" Valencia ").is_some());
        assert!(registry.get("atlantis").is_none());
    }

    #[test]
    fn external_file_adds_and_overrides() {
        let mut registry = RegionRegistry::builtin();
        let merged = registry
            .extend_from_toml_str(
                r#"
                [[regions]]
                id = "Test"
                name = "Test Square"
                bounds = { south = 0.0, north = 10.0, west = 0.0, east = 10.0 }

                [[regions]]
                id = "madrid"
                name = "Madrid (centro)"
                bounds = { south = 40.40, north = 40.44, west = -3.72, east = -3.68 }
                "#,
            )
            .unwrap();

        assert_eq!(merged, 2);
        assert_eq!(registry.len(), EXPECTED_REGION_COUNT + 1);
        assert_eq!(registry.get("test").unwrap().bounds.north, 10.0);
        assert_eq!(registry.get("madrid").unwrap().name, "Madrid (centro)");
    }

    #[test]
    fn external_file_with_bad_bounds_is_rejected_whole() {
        let mut registry = RegionRegistry::builtin();
        let result = registry.extend_from_toml_str(
            r#"
            [[regions]]
            id = "good"
            name = "Good"
            bounds = { south = 0.0, north = 1.0, west = 0.0, east = 1.0 }

            [[regions]]
            id = "flipped"
            name = "Flipped"
            bounds = { south = 5.0, north = 1.0, west = 0.0, east = 1.0 }
            "#,
        );

        assert!(matches!(result, Err(RegionError::InvalidBounds { ref id, .. }) if id == "flipped"));
        assert!(registry.get("good").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let region = RegionDefinition {
            id: "dup".to_string(),
            name: "Dup".to_string(),
            country: None,
            bounds: GeoBounds::new(0.0, 1.0, 0.0, 1.0),
        };
        let result = RegionRegistry::from_definitions([region.clone(), region]);
        assert!(matches!(result, Err(RegionError::Duplicate { .. })));
    }
}
