//! Maintenance units: named, independently triggerable procedures.
//!
//! A unit is plain data ([`UnitSpec`]) describing which procedure to run,
//! with which parameters, under which retry policy and schedule. Units are
//! handed to a [`Registrar`] explicitly; the schedule itself is honoured by
//! the external orchestrator.

pub mod catalog;
pub mod discovery;
pub mod runner;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::{ComposeAction, RetryPolicy};

pub use catalog::{Registrar, UnitCatalog};
pub use discovery::{
    discover_compose_units, has_compose_file, local_hostname, network_health_unit,
    COMPOSE_FILE_NAMES,
};
pub use runner::{UnitOutcome, UnitRunner};

/// Declaration of a maintenance unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Unique name; registering a unit with an existing name replaces it
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Cron expression, evaluated by the orchestrator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    #[serde(default)]
    pub retry: RetryPolicy,

    pub params: UnitParams,
}

/// Which procedure a unit runs, and its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitParams {
    /// Compose stack maintenance
    Compose {
        compose_dir: PathBuf,
        /// Fixed action; when absent the action is chosen at trigger time
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<ComposeAction>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        services: Vec<String>,
        #[serde(default)]
        remove_volumes: bool,
    },

    /// Ping hosts and probe endpoints
    NetworkHealth {
        #[serde(default)]
        hosts: Option<Vec<String>>,
        #[serde(default)]
        endpoints: Option<Vec<String>>,
    },
}

impl UnitSpec {
    /// Short label for the procedure kind
    pub fn kind(&self) -> &'static str {
        match self.params {
            UnitParams::Compose { .. } => "compose",
            UnitParams::NetworkHealth { .. } => "network_health",
        }
    }
}
