//! The queue service boundary.
//!
//! Everything the consumption pipeline needs from the managed queue goes
//! through [`QueueGateway`]. [`SqsGateway`] backs it with `aws-sdk-sqs`; tests
//! substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::GatewayError;

mod sqs;
mod types;

pub use sqs::SqsGateway;
pub use types::{Message, QueueAddress, ReceiptHandle, ReceiveBatch, SendReceipt};

/// Parameters for a single receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Upper bound on messages returned; SQS caps this at 10.
    pub max_messages: i32,

    /// How long received messages stay hidden from other consumers.
    pub visibility_timeout: Duration,

    /// Long-poll wait. Zero means return immediately.
    pub wait_time: Duration,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        ReceiveOptions {
            max_messages: 10,
            visibility_timeout: Duration::from_secs(60),
            wait_time: Duration::ZERO,
        }
    }
}

/// Operations the core consumes from the managed queue.
///
/// Implementations must be safe to share across the poll loop and every
/// in-flight worker, and must not retry on their own.
#[async_trait]
pub trait QueueGateway: Send + Sync {
    /// Resolves a human-readable queue name to its address.
    async fn resolve_address(&self, queue_name: &str) -> Result<QueueAddress, GatewayError>;

    /// Sends one message. `delay` is a hint for when it becomes visible.
    async fn send(
        &self,
        address: &QueueAddress,
        body: &str,
        delay: Duration,
    ) -> Result<SendReceipt, GatewayError>;

    /// Receives up to `options.max_messages` messages.
    async fn receive(
        &self,
        address: &QueueAddress,
        options: ReceiveOptions,
    ) -> Result<ReceiveBatch, GatewayError>;

    /// Deletes a received message. The receipt handle is consumed.
    async fn delete(
        &self,
        address: &QueueAddress,
        receipt_handle: ReceiptHandle,
    ) -> Result<(), GatewayError>;
}
