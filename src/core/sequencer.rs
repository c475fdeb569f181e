//! Compose action sequencing.
//!
//! Each [`ComposeAction`] expands to a fixed list of [`ComposeStep`]s that
//! run in order against one stack directory. The first step that answers
//! `false` aborts the rest.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::lock::StackLocks;
use super::retry::{with_retry, RetryPolicy};
use crate::adapters::{ComposeCli, ProcessRunner};
use crate::error::Result;

/// Maintenance action on a compose stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposeAction {
    Up,
    Down,
    Restart,
    /// down, pull, up
    Update,
    /// pull, up without stopping first
    PullUp,
}

/// A single `docker compose` invocation within an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposeStep {
    Down,
    Pull,
    Up,
}

impl ComposeAction {
    pub const ALL: [ComposeAction; 5] = [
        ComposeAction::Up,
        ComposeAction::Down,
        ComposeAction::Restart,
        ComposeAction::Update,
        ComposeAction::PullUp,
    ];

    /// Steps executed for this action, in order
    pub fn steps(self) -> &'static [ComposeStep] {
        match self {
            ComposeAction::Up => &[ComposeStep::Up],
            ComposeAction::Down => &[ComposeStep::Down],
            ComposeAction::Restart => &[ComposeStep::Down, ComposeStep::Up],
            ComposeAction::Update => &[ComposeStep::Down, ComposeStep::Pull, ComposeStep::Up],
            ComposeAction::PullUp => &[ComposeStep::Pull, ComposeStep::Up],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComposeAction::Up => "up",
            ComposeAction::Down => "down",
            ComposeAction::Restart => "restart",
            ComposeAction::Update => "update",
            ComposeAction::PullUp => "pull_up",
        }
    }
}

impl fmt::Display for ComposeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComposeAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(ComposeAction::Up),
            "down" => Ok(ComposeAction::Down),
            "restart" => Ok(ComposeAction::Restart),
            "update" => Ok(ComposeAction::Update),
            "pull_up" | "pull-up" => Ok(ComposeAction::PullUp),
            other => Err(format!(
                "invalid compose action: {other} (expected up, down, restart, update or pull_up)"
            )),
        }
    }
}

impl ComposeStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ComposeStep::Down => "down",
            ComposeStep::Pull => "pull",
            ComposeStep::Up => "up",
        }
    }
}

impl fmt::Display for ComposeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation of the sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    /// Directory containing the compose file
    pub compose_dir: PathBuf,

    pub action: ComposeAction,

    /// Services to start; empty means all. Only used by the up step.
    pub services: Vec<String>,

    /// Pass `--volumes` to the down step
    pub remove_volumes: bool,
}

impl ComposeRequest {
    pub fn new(compose_dir: impl Into<PathBuf>, action: ComposeAction) -> Self {
        Self {
            compose_dir: compose_dir.into(),
            action,
            services: Vec::new(),
            remove_volumes: false,
        }
    }

    pub fn with_services(mut self, services: Vec<String>) -> Self {
        self.services = services;
        self
    }

    pub fn with_remove_volumes(mut self, remove_volumes: bool) -> Self {
        self.remove_volumes = remove_volumes;
        self
    }
}

/// Retry policies declared for each step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicies {
    pub up: RetryPolicy,
    pub down: RetryPolicy,
    pub pull: RetryPolicy,
}

impl Default for StepPolicies {
    fn default() -> Self {
        Self {
            up: RetryPolicy::fixed(2, 10),
            down: RetryPolicy::none(),
            pull: RetryPolicy::fixed(2, 10),
        }
    }
}

impl StepPolicies {
    /// No retries anywhere
    pub fn none() -> Self {
        Self {
            up: RetryPolicy::none(),
            down: RetryPolicy::none(),
            pull: RetryPolicy::none(),
        }
    }

    pub fn for_step(&self, step: ComposeStep) -> &RetryPolicy {
        match step {
            ComposeStep::Up => &self.up,
            ComposeStep::Down => &self.down,
            ComposeStep::Pull => &self.pull,
        }
    }
}

/// Runs compose actions step by step
pub struct Sequencer<R> {
    compose: ComposeCli<R>,
    locks: Option<StackLocks>,
    policies: StepPolicies,
}

impl<R: ProcessRunner> Sequencer<R> {
    /// Sequencer without stack locking and with the default step policies
    pub fn new(compose: ComposeCli<R>) -> Self {
        Self {
            compose,
            locks: None,
            policies: StepPolicies::default(),
        }
    }

    /// Serialize actions per stack directory through `locks`
    pub fn with_locks(mut self, locks: StackLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn with_policies(mut self, policies: StepPolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn compose(&self) -> &ComposeCli<R> {
        &self.compose
    }

    /// Execute the request's action; `Ok(false)` if any step failed.
    #[instrument(skip(self, request), fields(action = %request.action, dir = %request.compose_dir.display()))]
    pub async fn run(&self, request: &ComposeRequest) -> Result<bool> {
        let _guard = match &self.locks {
            Some(locks) => Some(locks.acquire(&request.compose_dir).await?),
            None => None,
        };

        let mut ok = true;
        for &step in request.action.steps() {
            ok = self.run_step(step, request).await?;
            if !ok {
                error!(
                    step = %step,
                    action = %request.action,
                    "compose {} failed, aborting {}",
                    step,
                    request.action
                );
                break;
            }
        }

        info!(
            "compose {} {}",
            request.action,
            if ok { "succeeded" } else { "FAILED" }
        );
        Ok(ok)
    }

    async fn run_step(&self, step: ComposeStep, request: &ComposeRequest) -> Result<bool> {
        let policy = self.policies.for_step(step);
        let label = format!("docker-compose-{}", step);
        let dir = request.compose_dir.as_path();

        match step {
            ComposeStep::Up => {
                with_retry(&label, policy, || self.compose.up(dir, &request.services)).await
            }
            ComposeStep::Down => {
                with_retry(&label, policy, || {
                    self.compose.down(dir, request.remove_volumes)
                })
                .await
            }
            ComposeStep::Pull => with_retry(&label, policy, || self.compose.pull(dir)).await,
        }
    }
}
