//! Pluggable unit of work run by every consumption worker.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::errors::ProcessError;
use crate::gateway::Message;

/// Processes one delivered message.
///
/// Delivery is at-least-once: the same logical message can arrive again after
/// a failed delete or a worker crash, so implementations must be idempotent
/// (upsert rather than append, or dedupe on a stable key such as
/// [`Message::message_id`]).
///
/// Returning `Ok(())` lets the worker delete the message. Any error leaves it
/// on the queue for redelivery.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, message: &Message) -> Result<(), ProcessError>;
}

/// Placeholder unit of work: waits a fixed duration, then records the
/// message id. Recording is a set insert, so repeated deliveries converge to
/// the same state.
#[derive(Debug)]
pub struct SimulatedProcessor {
    duration: Duration,
    processed: Mutex<HashSet<String>>,
}

impl SimulatedProcessor {
    pub fn new(duration: Duration) -> Self {
        SimulatedProcessor {
            duration,
            processed: Mutex::new(HashSet::new()),
        }
    }

    pub fn has_processed(&self, message_id: &str) -> bool {
        self.processed
            .lock()
            .map(|processed| processed.contains(message_id))
            .unwrap_or(false)
    }

    /// Processed ids, sorted.
    pub fn processed_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .processed
            .lock()
            .map(|processed| processed.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl Default for SimulatedProcessor {
    fn default() -> Self {
        SimulatedProcessor::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl MessageProcessor for SimulatedProcessor {
    async fn process(&self, message: &Message) -> Result<(), ProcessError> {
        info!(message_id = message.message_id(), "processing message");
        tokio::time::sleep(self.duration).await;

        self.processed
            .lock()
            .map_err(|_| ProcessError::Transient("processed set poisoned".to_string()))?
            .insert(message.message_id().to_string());

        info!(message_id = message.message_id(), "message processing completed");
        Ok(())
    }
}

/// Adapts an async handler function plus a shared resource into a
/// [`MessageProcessor`].
///
/// The handler receives the message body and a clone of the shared resource
/// on every call.
///
/// ```rust,no_run
/// use rs_sqs_dispatch::processor::FnProcessor;
///
/// let processor = FnProcessor::new(
///     |body: String, prefix: String| async move {
///         println!("{prefix}: {body}");
///         Ok(())
///     },
///     "orders".to_string(),
/// );
/// ```
pub struct FnProcessor<F, TShared> {
    handler: F,
    shared_resources: TShared,
}

impl<F, Fut, TShared> FnProcessor<F, TShared>
where
    F: Fn(String, TShared) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
    TShared: Send + Sync + Clone + 'static,
{
    pub fn new(handler: F, shared_resources: TShared) -> Self {
        FnProcessor {
            handler,
            shared_resources,
        }
    }
}

#[async_trait]
impl<F, Fut, TShared> MessageProcessor for FnProcessor<F, TShared>
where
    F: Fn(String, TShared) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
    TShared: Send + Sync + Clone + 'static,
{
    async fn process(&self, message: &Message) -> Result<(), ProcessError> {
        (self.handler)(message.body().to_string(), self.shared_resources.clone()).await
    }
}
