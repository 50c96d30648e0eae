use thiserror::Error;

/// Errors reported by a [`QueueGateway`](crate::gateway::QueueGateway).
///
/// The gateway never retries on its own; every failure is handed back to the
/// caller, which decides whether to surface it (HTTP paths) or apply the
/// poll loop's [`ReceiveFailurePolicy`](crate::receiver::config::ReceiveFailurePolicy).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The queue name could not be resolved to an address.
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    /// The receipt handle is no longer valid, usually because the
    /// visibility window elapsed and the message was redelivered.
    #[error("receipt handle expired or invalid: {0}")]
    ReceiptExpired(String),

    /// Any network or service level failure.
    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
}

impl GatewayError {
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        GatewayError::Transport {
            operation,
            message: message.into(),
        }
    }
}

/// Failure classification returned by a
/// [`MessageProcessor`](crate::processor::MessageProcessor).
///
/// Neither variant causes the message to be deleted. The distinction only
/// changes how the failure is logged; redelivery and dead-lettering are
/// governed by the queue's own redrive policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessError {
    /// The same message may succeed on a later delivery.
    #[error("transient processing failure: {0}")]
    Transient(String),

    /// The message will never succeed; left for the dead-letter policy.
    #[error("non-retryable processing failure: {0}")]
    NonRetryable(String),
}

impl ProcessError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProcessError::Transient(_))
    }
}

/// Reasons a poll loop stops without being cancelled.
#[derive(Debug, Error)]
pub enum PollError {
    /// Receive failed under [`ReceiveFailurePolicy::Stop`](crate::receiver::config::ReceiveFailurePolicy::Stop).
    #[error("receive failed, poll loop stopped: {0}")]
    Receive(#[source] GatewayError),

    /// Receive kept failing past the configured retry budget.
    #[error("receive failed {attempts} consecutive times, last error: {last}")]
    TooManyFailures {
        attempts: u32,
        #[source]
        last: GatewayError,
    },
}
