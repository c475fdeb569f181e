//! Reachability probes: ICMP via the OS `ping` utility, HTTP via reqwest.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{FlowError, Result};

/// Echo requests sent per ping
pub const PING_COUNT: u32 = 3;

/// Seconds `ping` waits for each reply
pub const PING_WAIT_SECS: u32 = 2;

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_REDIRECTS: usize = 10;

/// Probes a single target
#[async_trait]
pub trait Probe: Send + Sync {
    /// True when `ping` exits with code 0
    async fn ping(&self, host: &str) -> Result<bool>;

    /// Final HTTP status of a GET after following redirects.
    ///
    /// Transport failures are errors, not statuses.
    async fn http_status(&self, url: &str) -> Result<u16>;
}

/// Probe backed by the host's `ping` binary and a reqwest client
#[derive(Debug, Clone)]
pub struct SystemProbe {
    client: reqwest::Client,
    ping_binary: String,
}

impl SystemProbe {
    /// Create a probe with the default 10 second HTTP timeout
    pub fn new() -> Result<Self> {
        Self::with_http_timeout(HTTP_TIMEOUT)
    }

    pub fn with_http_timeout(http_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|source| FlowError::Http {
                url: String::new(),
                source,
            })?;

        Ok(Self::with_client(client))
    }

    /// Probe over a caller-built HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            ping_binary: "ping".to_string(),
        }
    }

    /// Use a different ping executable
    pub fn with_ping_binary(mut self, binary: impl Into<String>) -> Self {
        self.ping_binary = binary.into();
        self
    }
}

/// Arguments passed to `ping` for one host
pub fn ping_args(host: &str) -> Vec<String> {
    vec![
        "-c".to_string(),
        PING_COUNT.to_string(),
        "-W".to_string(),
        PING_WAIT_SECS.to_string(),
        host.to_string(),
    ]
}

#[async_trait]
impl Probe for SystemProbe {
    async fn ping(&self, host: &str) -> Result<bool> {
        let status = Command::new(&self.ping_binary)
            .args(ping_args(host))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| FlowError::Spawn {
                command: format!("{} {}", self.ping_binary, ping_args(host).join(" ")),
                source,
            })?;

        let reachable = status.success();
        info!(
            host = %host,
            "ping {} -> {}",
            host,
            if reachable { "OK" } else { "UNREACHABLE" }
        );
        Ok(reachable)
    }

    async fn http_status(&self, url: &str) -> Result<u16> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FlowError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        info!(url = %url, status, "GET {} -> {}", url, status);
        Ok(status)
    }
}

/// 2xx and 3xx count as reachable
pub fn status_is_reachable(status: u16) -> bool {
    (200..400).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_args() {
        assert_eq!(ping_args("nas.local"), vec!["-c", "3", "-W", "2", "nas.local"]);
    }

    #[test]
    fn test_status_classification() {
        assert!(status_is_reachable(200));
        assert!(status_is_reachable(204));
        assert!(status_is_reachable(301));
        assert!(status_is_reachable(399));
        assert!(!status_is_reachable(199));
        assert!(!status_is_reachable(400));
        assert!(!status_is_reachable(404));
        assert!(!status_is_reachable(503));
    }

    #[tokio::test]
    async fn test_missing_ping_binary_is_spawn_error() {
        let probe = SystemProbe::new()
            .unwrap()
            .with_ping_binary("/nonexistent/homeflow-ping");

        let err = probe.ping("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, FlowError::Spawn { .. }));
        assert!(err.is_retryable());
    }
}
