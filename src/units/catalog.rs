//! Unit registration.
//!
//! Registration is an upsert keyed by unit name, so running the same
//! discovery and registration twice leaves the catalog unchanged.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::UnitSpec;

/// Accepts unit declarations
pub trait Registrar {
    /// Register `units`, replacing any with the same name.
    ///
    /// Returns the number of units handed in.
    fn register(&mut self, units: Vec<UnitSpec>) -> crate::error::Result<usize>;
}

/// On-disk layout of the catalog
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    units: Vec<UnitSpec>,
}

/// Local set of registered units, persisted as YAML
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitCatalog {
    units: BTreeMap<String, UnitSpec>,
}

impl UnitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog; a missing file is an empty catalog
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No unit catalog yet");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read unit catalog: {}", path.display()))?;
        let file: CatalogFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse unit catalog: {}", path.display()))?;

        Ok(Self {
            units: file
                .units
                .into_iter()
                .map(|unit| (unit.name.clone(), unit))
                .collect(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write unit catalog: {}", path.display()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        let file = CatalogFile {
            units: self.units.values().cloned().collect(),
        };
        serde_yaml::to_string(&file).context("Failed to serialize unit catalog")
    }

    pub fn get(&self, name: &str) -> Option<&UnitSpec> {
        self.units.get(name)
    }

    /// Unit names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.units.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitSpec> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Registrar for UnitCatalog {
    fn register(&mut self, units: Vec<UnitSpec>) -> crate::error::Result<usize> {
        let count = units.len();
        for unit in units {
            let replaced = self.units.insert(unit.name.clone(), unit);
            if let Some(old) = replaced {
                debug!(unit = %old.name, "Unit re-registered");
            }
        }
        info!(count, total = self.units.len(), "Units registered");
        Ok(count)
    }
}
