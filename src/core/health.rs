//! Network reachability checks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::retry::{with_retry, RetryPolicy};
use crate::adapters::probe::{status_is_reachable, Probe};
use crate::error::Result;

/// Host pinged when the caller names none
pub const DEFAULT_HOST: &str = "192.168.1.1";

/// Targets of one health check.
///
/// `None` selects the default, an empty list checks nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(default)]
    pub hosts: Option<Vec<String>>,
    #[serde(default)]
    pub endpoints: Option<Vec<String>>,
}

impl TargetSpec {
    pub fn new(hosts: Option<Vec<String>>, endpoints: Option<Vec<String>>) -> Self {
        Self { hosts, endpoints }
    }

    pub fn resolved_hosts(&self) -> Vec<String> {
        match &self.hosts {
            Some(hosts) => hosts.clone(),
            None => vec![DEFAULT_HOST.to_string()],
        }
    }

    pub fn resolved_endpoints(&self) -> Vec<String> {
        self.endpoints.clone().unwrap_or_default()
    }
}

/// Target string to reachability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReachabilityReport(HashMap<String, bool>);

impl ReachabilityReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result; a repeated target overwrites the earlier value
    pub fn record(&mut self, target: impl Into<String>, reachable: bool) {
        self.0.insert(target.into(), reachable);
    }

    pub fn get(&self, target: &str) -> Option<bool> {
        self.0.get(target).copied()
    }

    pub fn reachable_count(&self) -> usize {
        self.0.values().filter(|v| **v).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn all_reachable(&self) -> bool {
        self.0.values().all(|v| *v)
    }

    pub fn as_map(&self) -> &HashMap<String, bool> {
        &self.0
    }

    pub fn into_map(self) -> HashMap<String, bool> {
        self.0
    }
}

impl From<HashMap<String, bool>> for ReachabilityReport {
    fn from(map: HashMap<String, bool>) -> Self {
        Self(map)
    }
}

/// Pings hosts, then probes endpoints, one at a time
pub struct ReachabilityChecker<P> {
    probe: P,
    ping_retry: RetryPolicy,
    http_retry: RetryPolicy,
}

impl<P: Probe> ReachabilityChecker<P> {
    /// Checker with the declared policies: ping 2 x 5 s, HTTP 2 x 10 s
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            ping_retry: RetryPolicy::fixed(2, 5),
            http_retry: RetryPolicy::fixed(2, 10),
        }
    }

    pub fn with_retry_policies(mut self, ping: RetryPolicy, http: RetryPolicy) -> Self {
        self.ping_retry = ping;
        self.http_retry = http;
        self
    }

    /// Run every check in `targets`.
    ///
    /// A host that does not answer is recorded as `false`. An endpoint whose
    /// transport keeps failing after retries aborts the whole check with an
    /// error.
    #[instrument(skip(self, targets))]
    pub async fn check(&self, targets: &TargetSpec) -> Result<ReachabilityReport> {
        let mut report = ReachabilityReport::new();

        for host in targets.resolved_hosts() {
            let reachable = with_retry("ping-host", &self.ping_retry, || self.probe.ping(&host)).await?;
            report.record(host, reachable);
        }

        for url in targets.resolved_endpoints() {
            let status =
                with_retry("http-check", &self.http_retry, || self.probe.http_status(&url)).await?;
            report.record(url, status_is_reachable(status));
        }

        info!(
            reachable = report.reachable_count(),
            total = report.len(),
            "Health check done: {}/{} targets reachable",
            report.reachable_count(),
            report.len()
        );
        Ok(report)
    }
}
