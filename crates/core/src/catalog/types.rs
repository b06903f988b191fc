//! Catalog data types.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or querying the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The requested engine family has no entry.
    #[error("unknown engine: {0}")]
    UnknownEngine(String),

    /// The engine exists but does not offer the requested size tier.
    #[error("unknown size tier '{size}' for engine {engine}")]
    UnknownSizeTier { engine: String, size: String },

    /// A catalog file could not be parsed.
    #[error("failed to parse catalog: {0}")]
    Parse(String),

    /// A catalog file could not be read.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// Instance sizing for one size tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeProfile {
    /// Instance class, e.g. `db.m5.large`.
    pub instance_class: String,
    /// Allocated storage in GiB.
    pub allocated_storage: u32,
}

/// Everything the generator needs to know about one engine family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineProfile {
    /// Human readable description.
    #[serde(default)]
    pub description: String,
    /// Engine kind, e.g. `mysql` or `postgres`.
    pub engine: String,
    /// Full engine version.
    pub engine_version: String,
    /// Parameter group family.
    pub family: String,
    /// Major engine version.
    pub major_engine_version: String,
    /// Port the engine listens on by default.
    pub port: u16,
    /// Log categories exported to CloudWatch.
    #[serde(default)]
    pub enabled_cloudwatch_logs_exports: Vec<String>,
    /// Size tier name to sizing.
    pub sizes: BTreeMap<String, SizeProfile>,
}

impl EngineProfile {
    /// Look up a size tier. `engine_key` is only used for the error message.
    pub fn size(&self, engine_key: &str, tier: &str) -> Result<&SizeProfile, CatalogError> {
        self.sizes
            .get(tier)
            .ok_or_else(|| CatalogError::UnknownSizeTier {
                engine: engine_key.to_string(),
                size: tier.to_string(),
            })
    }
}

/// The engine catalog, keyed by engine family name (e.g. `mysql8.0`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    engines: BTreeMap<String, EngineProfile>,
}

impl Catalog {
    /// Build a catalog from explicit entries.
    pub fn new(engines: BTreeMap<String, EngineProfile>) -> Self {
        Self { engines }
    }

    /// The builtin MySQL and PostgreSQL presets.
    pub fn builtin() -> Self {
        super::builtin::builtin_catalog()
    }

    /// Parse a catalog from TOML.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CatalogError> {
        toml::from_str(toml_str).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Load a catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Look up an engine family.
    pub fn engine(&self, family: &str) -> Result<&EngineProfile, CatalogError> {
        self.engines
            .get(family)
            .ok_or_else(|| CatalogError::UnknownEngine(family.to_string()))
    }

    /// Look up an engine family and one of its size tiers.
    pub fn resolve(
        &self,
        family: &str,
        tier: &str,
    ) -> Result<(&EngineProfile, &SizeProfile), CatalogError> {
        let engine = self.engine(family)?;
        let size = engine.size(family, tier)?;
        Ok((engine, size))
    }

    /// Iterate over all engine families.
    pub fn engines(&self) -> impl Iterator<Item = (&str, &EngineProfile)> {
        self.engines.iter().map(|(k, v)| (k.as_str(), v))
    }
}
