//! Invoke a registered unit.

use tracing::{info, instrument};

use super::{UnitParams, UnitSpec};
use crate::adapters::{Probe, ProcessRunner};
use crate::core::{
    with_retry, ComposeAction, ComposeRequest, ReachabilityChecker, ReachabilityReport,
    Sequencer, TargetSpec,
};
use crate::error::{FlowError, Result};

/// Result of one unit run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Compose(bool),
    Health(ReachabilityReport),
}

impl UnitOutcome {
    /// Compose action succeeded, or every health target was reachable
    pub fn succeeded(&self) -> bool {
        match self {
            UnitOutcome::Compose(ok) => *ok,
            UnitOutcome::Health(report) => report.all_reachable(),
        }
    }
}

/// Dispatches units to the sequencer or the reachability checker
pub struct UnitRunner<R, P> {
    sequencer: Sequencer<R>,
    checker: ReachabilityChecker<P>,
}

impl<R: ProcessRunner, P: Probe> UnitRunner<R, P> {
    pub fn new(sequencer: Sequencer<R>, checker: ReachabilityChecker<P>) -> Self {
        Self { sequencer, checker }
    }

    /// Run `unit` under its declared retry policy.
    ///
    /// For compose units `action` overrides the unit's own action; one of the
    /// two must be present.
    #[instrument(skip(self, unit), fields(unit = %unit.name, kind = unit.kind()))]
    pub async fn run(&self, unit: &UnitSpec, action: Option<ComposeAction>) -> Result<UnitOutcome> {
        info!("Running unit");
        let outcome = with_retry(&unit.name, &unit.retry, || self.run_once(unit, action)).await?;
        info!(succeeded = outcome.succeeded(), "Unit finished");
        Ok(outcome)
    }

    async fn run_once(&self, unit: &UnitSpec, action: Option<ComposeAction>) -> Result<UnitOutcome> {
        match &unit.params {
            UnitParams::Compose {
                compose_dir,
                action: declared,
                services,
                remove_volumes,
            } => {
                let action = action.or(*declared).ok_or_else(|| {
                    FlowError::Config(format!(
                        "unit {} has no action; pass one when triggering it",
                        unit.name
                    ))
                })?;

                let request = ComposeRequest::new(compose_dir.clone(), action)
                    .with_services(services.clone())
                    .with_remove_volumes(*remove_volumes);
                Ok(UnitOutcome::Compose(self.sequencer.run(&request).await?))
            }
            UnitParams::NetworkHealth { hosts, endpoints } => {
                let targets = TargetSpec::new(hosts.clone(), endpoints.clone());
                Ok(UnitOutcome::Health(self.checker.check(&targets).await?))
            }
        }
    }
}
