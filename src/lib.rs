//! homeflow - Home-lab maintenance units
//!
//! Docker Compose lifecycle management and network health checks, packaged
//! as named units that an external workflow orchestrator can schedule, or
//! that can be triggered by hand from the CLI.
//!
//! # Architecture
//!
//! - Side effects go through two injectable traits: `ProcessRunner` for
//!   subprocesses and `Probe` for ping / HTTP
//! - Compose actions expand to fixed step lists executed fail-fast
//! - Soft failures are `false`; hard failures are `FlowError`s, which the
//!   declared retry policies may re-attempt
//!
//! # Modules
//!
//! - `adapters`: External systems (subprocesses, docker compose, ping, HTTP)
//! - `core`: Procedures (Sequencer, ReachabilityChecker, retry, stack locks)
//! - `units`: Unit declarations, discovery, catalog, invocation
//! - `config`: Settings
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Pull new images and recreate a stack
//! homeflow compose ~/docker/nextcloud update
//!
//! # Check the router and an internal service
//! homeflow health --host 192.168.1.1 --endpoint http://nas.local
//!
//! # Register every stack under ~/docker, then trigger one
//! homeflow units discover ~/docker
//! homeflow units run nas-docker-nextcloud --action restart
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod units;

// Re-export main types at crate root for convenience
pub use crate::adapters::{CommandOutput, ProcessRunner, Probe, SystemProbe, SystemRunner};
pub use crate::core::{
    ComposeAction, ComposeRequest, ReachabilityChecker, ReachabilityReport, RetryPolicy,
    Sequencer, TargetSpec,
};
pub use crate::error::FlowError;
pub use crate::units::{Registrar, UnitCatalog, UnitOutcome, UnitRunner, UnitSpec};
