//! Command-line interface for homeflow.
//!
//! Provides commands for running compose actions, checking network health,
//! registering and triggering units, and showing the resolved settings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::{ComposeCli, SystemProbe, SystemRunner};
use crate::config::Settings;
use crate::core::{
    ComposeAction, ComposeRequest, ReachabilityChecker, Sequencer, StackLocks, TargetSpec,
};
use crate::units::{
    discover_compose_units, local_hostname, network_health_unit, Registrar, UnitCatalog,
    UnitOutcome, UnitRunner,
};

/// homeflow - Home-lab maintenance units
#[derive(Parser, Debug)]
#[command(name = "homeflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a Docker Compose maintenance action
    Compose {
        /// Directory containing the compose file
        compose_dir: PathBuf,

        /// Action to perform
        #[arg(value_enum)]
        action: ActionArg,

        /// Service to start (repeatable; default: all services)
        #[arg(short = 's', long = "service")]
        services: Vec<String>,

        /// Also remove named volumes on down (data is lost)
        #[arg(long)]
        remove_volumes: bool,

        /// Do not take the per-stack lock
        #[arg(long)]
        no_lock: bool,
    },

    /// Ping hosts and probe HTTP endpoints
    Health {
        /// Hosts to ping (omit for the default gateway, pass with no value for none)
        #[arg(long = "host", num_args = 0..)]
        hosts: Option<Vec<String>>,

        /// URLs to GET
        #[arg(long = "endpoint", num_args = 0..)]
        endpoints: Option<Vec<String>>,
    },

    /// Manage maintenance units
    Units {
        #[command(subcommand)]
        command: UnitCommands,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum UnitCommands {
    /// Register one unit per compose stack under a directory
    Discover {
        /// Directory whose subdirectories hold compose stacks
        search_path: PathBuf,

        /// Prefix for unit names (default: this machine's hostname)
        #[arg(long)]
        hostname: Option<String>,
    },

    /// Print registered units as YAML
    List,

    /// Trigger a registered unit
    Run {
        /// Unit name
        name: String,

        /// Compose action (required when the unit has none)
        #[arg(short, long, value_enum)]
        action: Option<ActionArg>,
    },
}

/// Compose action for CLI (maps to ComposeAction)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActionArg {
    /// Start the stack detached
    Up,

    /// Stop and remove the stack
    Down,

    /// down, then up
    Restart,

    /// down, pull, up
    Update,

    /// pull, then up without stopping
    #[value(alias = "pull_up")]
    PullUp,
}

impl From<ActionArg> for ComposeAction {
    fn from(a: ActionArg) -> Self {
        match a {
            ActionArg::Up => ComposeAction::Up,
            ActionArg::Down => ComposeAction::Down,
            ActionArg::Restart => ComposeAction::Restart,
            ActionArg::Update => ComposeAction::Update,
            ActionArg::PullUp => ComposeAction::PullUp,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self, settings: &Settings) -> Result<()> {
        match self.command {
            Commands::Compose {
                compose_dir,
                action,
                services,
                remove_volumes,
                no_lock,
            } => {
                let request = ComposeRequest::new(compose_dir, action.into())
                    .with_services(services)
                    .with_remove_volumes(remove_volumes);
                run_compose(settings, &request, !no_lock).await
            }
            Commands::Health { hosts, endpoints } => {
                run_health(TargetSpec::new(hosts, endpoints)).await
            }
            Commands::Units { command } => execute_units(settings, command).await,
            Commands::Config => show_config(settings),
        }
    }
}

/// Sequencer over real processes, configured from settings
fn build_sequencer(settings: &Settings, lock: bool) -> Sequencer<SystemRunner> {
    let compose = ComposeCli::with_timeouts(SystemRunner::new(), settings.compose.timeouts);
    let sequencer = Sequencer::new(compose);
    if lock {
        sequencer.with_locks(StackLocks::new(settings.locks_dir()))
    } else {
        sequencer
    }
}

fn build_checker() -> Result<ReachabilityChecker<SystemProbe>> {
    let probe = SystemProbe::new().context("Failed to build HTTP client")?;
    Ok(ReachabilityChecker::new(probe))
}

/// Run a compose action directly
async fn run_compose(settings: &Settings, request: &ComposeRequest, lock: bool) -> Result<()> {
    let sequencer = build_sequencer(settings, lock && settings.compose.lock);
    let ok = sequencer.run(request).await?;

    if !ok {
        anyhow::bail!(
            "compose {} failed for {}",
            request.action,
            request.compose_dir.display()
        );
    }
    Ok(())
}

/// Run a health check and print the report as JSON
async fn run_health(targets: TargetSpec) -> Result<()> {
    let checker = build_checker()?;
    let report = checker.check(&targets).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Execute unit subcommands
async fn execute_units(settings: &Settings, command: UnitCommands) -> Result<()> {
    let catalog_path = settings.catalog_path();

    match command {
        UnitCommands::Discover {
            search_path,
            hostname,
        } => {
            let hostname = hostname.unwrap_or_else(local_hostname);
            let mut units = discover_compose_units(&search_path, &hostname)?;
            units.push(network_health_unit());

            let names: Vec<String> = units.iter().map(|u| u.name.clone()).collect();

            let mut catalog = UnitCatalog::load(&catalog_path)?;
            catalog.register(units)?;
            catalog.save(&catalog_path)?;

            println!("Registered {} units in {}:", names.len(), catalog_path.display());
            for name in names {
                println!("  {}", name);
            }
            Ok(())
        }
        UnitCommands::List => {
            let catalog = UnitCatalog::load(&catalog_path)?;
            if catalog.is_empty() {
                println!("No units registered");
                return Ok(());
            }

            print!("{}", catalog.to_yaml()?);
            Ok(())
        }
        UnitCommands::Run { name, action } => {
            let catalog = UnitCatalog::load(&catalog_path)?;
            let unit = catalog
                .get(&name)
                .with_context(|| format!("Unit not found: {}", name))?;

            let runner = UnitRunner::new(
                build_sequencer(settings, settings.compose.lock),
                build_checker()?,
            );

            match runner.run(unit, action.map(Into::into)).await? {
                UnitOutcome::Compose(true) => Ok(()),
                UnitOutcome::Compose(false) => anyhow::bail!("Unit {} failed", name),
                UnitOutcome::Health(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(())
                }
            }
        }
    }
}

/// Print resolved settings
fn show_config(settings: &Settings) -> Result<()> {
    println!("homeflow configuration");
    println!();
    println!(
        "Config file: {}",
        settings
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Orchestrator API: {}", settings.api_url);
    println!("Log level:        {}", settings.log_level);
    println!();
    println!("Paths:");
    println!("  Home:    {}", settings.home.display());
    println!("  Locks:   {}", settings.locks_dir().display());
    println!("  Catalog: {}", settings.catalog_path().display());
    println!();
    println!("Compose:");
    println!("  up timeout:   {}s", settings.compose.timeouts.up.as_secs());
    println!("  down timeout: {}s", settings.compose.timeouts.down.as_secs());
    println!("  pull timeout: {}s", settings.compose.timeouts.pull.as_secs());
    println!("  stack locks:  {}", settings.compose.lock);

    Ok(())
}
