//! Shared test fixtures: tracing setup, a scripted process runner and a
//! scripted probe.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::{fmt, EnvFilter};

use homeflow::error::Result;
use homeflow::{CommandOutput, FlowError, Probe, ProcessRunner};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Output is captured per test and only shown for failures.
/// `RUST_LOG=debug cargo test` to see more.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Canned answer for one fake process invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Success,
    Exit(i32),
    TimedOut,
    SpawnError,
    ConfigError,
}

impl Reply {
    fn into_result(self, command: &[String]) -> Result<CommandOutput> {
        match self {
            Reply::Success => Ok(CommandOutput::completed(Some(0), "")),
            Reply::Exit(code) => Ok(CommandOutput::completed(Some(code), "error output")),
            Reply::TimedOut => Ok(CommandOutput::timed_out()),
            Reply::SpawnError => Err(FlowError::Spawn {
                command: command.join(" "),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "docker not found"),
            }),
            Reply::ConfigError => Err(FlowError::Config("no such directory".to_string())),
        }
    }
}

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub command: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl Call {
    /// `docker compose <subcommand>` -> subcommand
    pub fn subcommand(&self) -> &str {
        self.command.get(2).map(|s| s.as_str()).unwrap_or("")
    }
}

/// A fake process runner that:
/// - records every invocation
/// - answers from a per-subcommand queue, `Success` once the queue is empty
/// - optionally holds each invocation open to expose overlap
#[derive(Clone, Default)]
pub struct FakeRunner {
    calls: Arc<Mutex<Vec<Call>>>,
    replies: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    hold: Option<Duration>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for a compose subcommand (`up`, `down`, `pull`)
    pub fn reply(self, subcommand: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(subcommand.to_string())
            .or_default()
            .extend(replies);
        self
    }

    pub fn hold_for(mut self, duration: Duration) -> Self {
        self.hold = Some(duration);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.subcommand().to_string())
            .collect()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        command: &[String],
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let call = Call {
            command: command.to_vec(),
            working_dir: working_dir.to_path_buf(),
            timeout,
        };
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            replies
                .get_mut(call.subcommand())
                .and_then(|queue| queue.pop_front())
                .unwrap_or(Reply::Success)
        };
        self.calls.lock().unwrap().push(call);

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if let Some(hold) = self.hold {
            tokio::time::sleep(hold).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        reply.into_result(command)
    }
}

/// Canned answer for one fake HTTP probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpReply {
    Status(u16),
    TransportError,
}

/// A fake probe with fixed ping answers and queued HTTP answers.
///
/// Unknown hosts are unreachable; unknown endpoints fail at transport level.
#[derive(Clone, Default)]
pub struct FakeProbe {
    hosts: HashMap<String, bool>,
    endpoints: Arc<Mutex<HashMap<String, VecDeque<HttpReply>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: &str, reachable: bool) -> Self {
        self.hosts.insert(host.to_string(), reachable);
        self
    }

    /// Queue replies for `url`; the last reply repeats forever
    pub fn endpoint(self, url: &str, replies: impl IntoIterator<Item = HttpReply>) -> Self {
        self.endpoints
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(replies);
        self
    }

    /// Probes in the order they happened, as `ping <host>` / `GET <url>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Probe for FakeProbe {
    async fn ping(&self, host: &str) -> Result<bool> {
        self.calls.lock().unwrap().push(format!("ping {}", host));
        Ok(self.hosts.get(host).copied().unwrap_or(false))
    }

    async fn http_status(&self, url: &str) -> Result<u16> {
        self.calls.lock().unwrap().push(format!("GET {}", url));

        let reply = {
            let mut endpoints = self.endpoints.lock().unwrap();
            match endpoints.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().copied(),
                None => None,
            }
        };

        match reply {
            Some(HttpReply::Status(status)) => Ok(status),
            Some(HttpReply::TransportError) | None => Err(FlowError::Io {
                command: format!("GET {}", url),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ),
            }),
        }
    }
}
