//! Configuration for homeflow.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (HOMEFLOW_API_URL, HOMEFLOW_LOG_LEVEL, HOMEFLOW_HOME)
//! 2. Config file (.homeflow/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .homeflow/config.yaml
//! - `paths.home` in the config file is relative to the .homeflow/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::ComposeTimeouts;

pub const DEFAULT_API_URL: &str = "http://localhost:4200/api";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

pub const ENV_API_URL: &str = "HOMEFLOW_API_URL";
pub const ENV_LOG_LEVEL: &str = "HOMEFLOW_LOG_LEVEL";
pub const ENV_HOME: &str = "HOMEFLOW_HOME";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<Settings, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub orchestrator: Option<OrchestratorConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub compose: Option<ComposeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .homeflow/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeConfig {
    pub up_timeout_seconds: Option<u64>,
    pub down_timeout_seconds: Option<u64>,
    pub pull_timeout_seconds: Option<u64>,
    /// Serialize actions per stack directory
    pub lock: Option<bool>,
}

/// Resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Orchestrator API URL
    pub api_url: String,
    /// Root log level
    pub log_level: String,
    /// Absolute path to homeflow home (locks, unit catalog)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Compose settings
    pub compose: ComposeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeSettings {
    pub timeouts: ComposeTimeouts,
    pub lock: bool,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            timeouts: ComposeTimeouts::default(),
            lock: true,
        }
    }
}

impl Settings {
    /// Directory holding per-stack lock files
    pub fn locks_dir(&self) -> PathBuf {
        self.home.join("locks")
    }

    /// Registered unit catalog
    pub fn catalog_path(&self) -> PathBuf {
        self.home.join("units.yaml")
    }
}

/// Filter directive for a configured log level, case-insensitive.
///
/// Accepts tracing's level names plus `WARNING`, `CRITICAL` and `FATAL`.
/// `None` for anything else.
pub fn level_directive(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" | "fatal" => Some("error"),
        "off" => Some("off"),
        _ => None,
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".homeflow").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge env, file and defaults
fn resolve(
    file: Option<(PathBuf, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
    default_home: PathBuf,
) -> Settings {
    let (config_file, config) = match file {
        Some((path, config)) => (Some(path), Some(config)),
        None => (None, None),
    };

    let api_url = env(ENV_API_URL)
        .or_else(|| {
            config
                .as_ref()
                .and_then(|c| c.orchestrator.as_ref())
                .and_then(|o| o.api_url.clone())
        })
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let log_level = env(ENV_LOG_LEVEL)
        .or_else(|| {
            config
                .as_ref()
                .and_then(|c| c.logging.as_ref())
                .and_then(|l| l.level.clone())
        })
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    let home = if let Some(env_home) = env(ENV_HOME) {
        PathBuf::from(env_home)
    } else if let (Some(path), Some(home)) = (
        config_file.as_ref(),
        config.as_ref().and_then(|c| c.paths.home.as_ref()),
    ) {
        let homeflow_dir = path.parent().unwrap_or(Path::new("."));
        resolve_path(homeflow_dir, home)
    } else {
        default_home
    };

    let compose = match config.as_ref().and_then(|c| c.compose.as_ref()) {
        Some(c) => {
            let defaults = ComposeTimeouts::default();
            ComposeSettings {
                timeouts: ComposeTimeouts {
                    up: c.up_timeout_seconds.map(Duration::from_secs).unwrap_or(defaults.up),
                    down: c
                        .down_timeout_seconds
                        .map(Duration::from_secs)
                        .unwrap_or(defaults.down),
                    pull: c
                        .pull_timeout_seconds
                        .map(Duration::from_secs)
                        .unwrap_or(defaults.pull),
                },
                lock: c.lock.unwrap_or(true),
            }
        }
        None => ComposeSettings::default(),
    };

    Settings {
        api_url,
        log_level,
        home,
        config_file,
        compose,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<Settings> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".homeflow");

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let file = match find_config_file(&cwd) {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    Ok(resolve(file, |key| std::env::var(key).ok(), default_home))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static Settings> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<Settings> {
    load_config()
}
