//! Adapter interfaces for external systems.
//!
//! Everything with a side effect on the host goes through one of two traits
//! so the sequencer and the checker can be exercised with fakes:
//! - [`ProcessRunner`]: run a command in a directory with a timeout
//! - [`Probe`]: ping a host, GET an endpoint

pub mod compose;
pub mod probe;
pub mod process;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use compose::{ComposeCli, ComposeTimeouts};
pub use probe::{Probe, SystemProbe};
pub use process::{resolve_working_dir, SystemRunner};

/// Outcome of one subprocess invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code was exactly 0
    pub success: bool,

    /// Merged stdout/stderr, lossily decoded and trimmed
    pub output: String,

    /// Exit code, absent when the child was killed by a signal
    pub exit_code: Option<i32>,

    /// The timeout expired and the child was killed
    pub timed_out: bool,
}

impl CommandOutput {
    /// Build an output from a finished process
    pub fn completed(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            success: exit_code == Some(0),
            output: output.into(),
            exit_code,
            timed_out: false,
        }
    }

    /// Output of a process that was killed after its timeout.
    ///
    /// Anything captured before the kill is dropped.
    pub fn timed_out() -> Self {
        Self {
            success: false,
            output: String::new(),
            exit_code: None,
            timed_out: true,
        }
    }
}

/// Runs external commands
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` (program followed by its arguments) inside
    /// `working_dir`, giving up after `timeout`.
    async fn run(
        &self,
        command: &[String],
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_exit_zero() {
        assert!(CommandOutput::completed(Some(0), "ok").success);
        assert!(!CommandOutput::completed(Some(1), "").success);
        assert!(!CommandOutput::completed(None, "").success);
    }

    #[test]
    fn test_timed_out_output_is_empty() {
        let out = CommandOutput::timed_out();
        assert!(!out.success);
        assert!(out.output.is_empty());
        assert!(out.timed_out);
    }
}
