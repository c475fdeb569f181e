//! Compose stack discovery and built-in unit declarations.

use std::path::Path;

use tracing::{debug, info};

use super::{UnitParams, UnitSpec};
use crate::core::{RetryPolicy, DEFAULT_HOST};
use crate::error::{FlowError, Result};

/// File names that mark a directory as a compose stack
pub const COMPOSE_FILE_NAMES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Whether `dir` directly contains a compose file
pub fn has_compose_file(dir: &Path) -> bool {
    COMPOSE_FILE_NAMES.iter().any(|name| dir.join(name).exists())
}

/// Name of this machine, used to prefix discovered units.
///
/// `HOSTNAME` env var, then `/etc/hostname`, then `localhost`.
pub fn local_hostname() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// One unit per immediate subdirectory of `search_path` holding a compose
/// file, named `<hostname>-docker-<dirname>`, sorted by directory name.
///
/// The action is left open so it can be picked when the unit is triggered.
pub fn discover_compose_units(search_path: &Path, hostname: &str) -> Result<Vec<UnitSpec>> {
    let entries = std::fs::read_dir(search_path).map_err(|e| {
        FlowError::Config(format!(
            "cannot read search path {}: {}",
            search_path.display(),
            e
        ))
    })?;

    let mut candidates: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    candidates.sort();

    let tags = vec![
        "docker".to_string(),
        "maintenance".to_string(),
        hostname.to_string(),
    ];

    let mut units = Vec::new();
    for candidate in candidates {
        if !has_compose_file(&candidate) {
            debug!(dir = %candidate.display(), "No compose file, skipping");
            continue;
        }

        let Some(dir_name) = candidate.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };

        units.push(UnitSpec {
            name: format!("{}-docker-{}", hostname, dir_name),
            description: Some(format!("Docker Compose maintenance for {}", dir_name)),
            tags: tags.clone(),
            schedule: None,
            retry: RetryPolicy::none(),
            params: UnitParams::Compose {
                compose_dir: candidate,
                action: None,
                services: Vec::new(),
                remove_volumes: false,
            },
        });
    }

    if units.is_empty() {
        return Err(FlowError::Config(format!(
            "No docker-compose directories found under {}",
            search_path.display()
        )));
    }

    info!(
        count = units.len(),
        search_path = %search_path.display(),
        "Discovered compose stacks"
    );
    Ok(units)
}

/// Hourly reachability check of the default gateway
pub fn network_health_unit() -> UnitSpec {
    UnitSpec {
        name: "network-health-check-hourly".to_string(),
        description: Some("Ping home-network devices and probe internal services".to_string()),
        tags: vec!["network".to_string(), "monitoring".to_string()],
        schedule: Some("0 * * * *".to_string()),
        retry: RetryPolicy::none(),
        params: UnitParams::NetworkHealth {
            hosts: Some(vec![DEFAULT_HOST.to_string()]),
            endpoints: Some(Vec::new()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_has_compose_file_variants() {
        let temp = TempDir::new().unwrap();
        assert!(!has_compose_file(temp.path()));

        for name in COMPOSE_FILE_NAMES {
            let dir = temp.path().join(name.replace('.', "_"));
            std::fs::create_dir(&dir).unwrap();
            std::fs::write(dir.join(name), "services: {}\n").unwrap();
            assert!(has_compose_file(&dir), "{name} not detected");
        }
    }

    #[test]
    fn test_network_health_unit() {
        let unit = network_health_unit();
        assert_eq!(unit.name, "network-health-check-hourly");
        assert_eq!(unit.schedule.as_deref(), Some("0 * * * *"));
        assert_eq!(unit.kind(), "network_health");
    }

    #[test]
    fn test_missing_search_path_is_config_error() {
        let temp = TempDir::new().unwrap();
        let err = discover_compose_units(&temp.path().join("missing"), "nas").unwrap_err();
        assert!(matches!(err, FlowError::Config(_)));
    }
}
