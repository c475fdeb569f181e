//! Maintenance procedures.
//!
//! This module contains:
//! - Sequencer: compose actions as ordered, fail-fast steps
//! - Health: reachability checks over hosts and endpoints
//! - Retry: declared fixed-delay retry policies
//! - Lock: per-stack advisory locks

pub mod health;
pub mod lock;
pub mod retry;
pub mod sequencer;

// Re-export commonly used types
pub use health::{ReachabilityChecker, ReachabilityReport, TargetSpec, DEFAULT_HOST};
pub use lock::{StackGuard, StackLocks};
pub use retry::{with_retry, RetryPolicy};
pub use sequencer::{ComposeAction, ComposeRequest, ComposeStep, Sequencer, StepPolicies};
