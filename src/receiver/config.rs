use std::time::Duration;

use crate::gateway::ReceiveOptions;

use super::backoff::BackoffConfig;

/// What the poll loop does when a receive call fails.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveFailurePolicy {
    /// Log the error and return from the loop.
    Stop,

    /// Sleep with exponential backoff and try again. After
    /// `max_consecutive_failures` failures in a row the loop gives up.
    Retry {
        backoff: BackoffConfig,
        max_consecutive_failures: u32,
    },
}

impl Default for ReceiveFailurePolicy {
    fn default() -> Self {
        ReceiveFailurePolicy::Retry {
            backoff: BackoffConfig::default(),
            max_consecutive_failures: 5,
        }
    }
}

/// Configuration for one poll loop.
///
/// # Fields
/// - `receive`: batch size, visibility window and long-poll wait for each receive.
/// - `empty_backoff`: sleep after a receive returns no messages.
/// - `inter_batch_delay`: sleep after dispatching a non-empty batch.
/// - `failure_policy`: how receive errors are handled.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub receive: ReceiveOptions,
    pub empty_backoff: Duration,
    pub inter_batch_delay: Duration,
    pub failure_policy: ReceiveFailurePolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            receive: ReceiveOptions::default(),
            empty_backoff: Duration::from_secs(60),
            inter_batch_delay: Duration::from_secs(30),
            failure_policy: ReceiveFailurePolicy::default(),
        }
    }
}

/// Limits applied to every consumption worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Maximum concurrent processor invocations. `None` means unbounded.
    pub max_in_flight: Option<usize>,

    /// Deadline for one processor invocation. Expiry counts as a transient failure.
    pub processing_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            max_in_flight: Some(64),
            processing_timeout: None,
        }
    }
}
