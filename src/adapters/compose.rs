//! `docker compose` invocations.
//!
//! The invoking OS user must be able to run `docker compose` without
//! elevation (on Linux: membership in the `docker` group).

use std::path::Path;
use std::time::Duration;

use tracing::{debug, error};

use super::ProcessRunner;
use crate::error::Result;

/// Per-subcommand timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeTimeouts {
    pub up: Duration,
    pub down: Duration,
    pub pull: Duration,
}

impl Default for ComposeTimeouts {
    fn default() -> Self {
        Self {
            up: Duration::from_secs(180),
            down: Duration::from_secs(120),
            pull: Duration::from_secs(300),
        }
    }
}

/// Arguments for starting a stack detached, optionally scoped to services
pub fn up_args(services: &[String]) -> Vec<String> {
    let mut args: Vec<String> = ["up", "-d", "--remove-orphans"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.extend(services.iter().cloned());
    args
}

/// Arguments for stopping and removing a stack
pub fn down_args(remove_volumes: bool) -> Vec<String> {
    let mut args = vec!["down".to_string()];
    if remove_volumes {
        args.push("--volumes".to_string());
    }
    args
}

pub fn pull_args() -> Vec<String> {
    vec!["pull".to_string()]
}

/// `docker compose` front end over a [`ProcessRunner`]
#[derive(Debug, Clone)]
pub struct ComposeCli<R> {
    runner: R,
    timeouts: ComposeTimeouts,
}

impl<R: ProcessRunner> ComposeCli<R> {
    pub fn new(runner: R) -> Self {
        Self::with_timeouts(runner, ComposeTimeouts::default())
    }

    pub fn with_timeouts(runner: R, timeouts: ComposeTimeouts) -> Self {
        Self { runner, timeouts }
    }

    pub fn timeouts(&self) -> &ComposeTimeouts {
        &self.timeouts
    }

    /// `docker compose up -d --remove-orphans [service...]`
    pub async fn up(&self, compose_dir: &Path, services: &[String]) -> Result<bool> {
        self.invoke(up_args(services), compose_dir, self.timeouts.up)
            .await
    }

    /// `docker compose down [--volumes]`
    ///
    /// `remove_volumes` deletes named volumes, and the data in them.
    pub async fn down(&self, compose_dir: &Path, remove_volumes: bool) -> Result<bool> {
        self.invoke(down_args(remove_volumes), compose_dir, self.timeouts.down)
            .await
    }

    /// `docker compose pull`
    pub async fn pull(&self, compose_dir: &Path) -> Result<bool> {
        self.invoke(pull_args(), compose_dir, self.timeouts.pull)
            .await
    }

    async fn invoke(&self, args: Vec<String>, compose_dir: &Path, limit: Duration) -> Result<bool> {
        let subcommand = args.first().cloned().unwrap_or_default();
        let mut command = vec!["docker".to_string(), "compose".to_string()];
        command.extend(args);

        let result = self.runner.run(&command, compose_dir, limit).await?;
        if result.timed_out {
            error!(
                subcommand = %subcommand,
                timeout_secs = limit.as_secs(),
                "docker compose timed out"
            );
        } else if !result.success {
            error!(
                subcommand = %subcommand,
                exit_code = result.exit_code.unwrap_or(-1),
                "docker compose exited unsuccessfully"
            );
        } else {
            debug!(subcommand = %subcommand, "docker compose finished");
        }

        Ok(result.success)
    }
}
