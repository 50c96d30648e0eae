use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

use super::config::WorkerConfig;
use super::worker::{ProcessingOutcome, consume};
use crate::gateway::{Message, QueueAddress, QueueGateway, ReceiveBatch};
use crate::processor::MessageProcessor;

/// Hands each received message to its own consumption worker task.
///
/// Shared by the poll loops and the HTTP receive path. Dispatching never
/// waits for a worker: the returned handles can be awaited or dropped.
/// When `max_in_flight` is set, workers queue on a shared semaphore before
/// processing, so bursts are capped without stalling the caller.
#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<dyn QueueGateway>,
    processor: Arc<dyn MessageProcessor>,
    limiter: Option<Arc<Semaphore>>,
    processing_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn QueueGateway>,
        processor: Arc<dyn MessageProcessor>,
        config: &WorkerConfig,
    ) -> Self {
        Dispatcher {
            gateway,
            processor,
            limiter: config
                .max_in_flight
                .filter(|limit| *limit > 0)
                .map(|limit| Arc::new(Semaphore::new(limit))),
            processing_timeout: config.processing_timeout,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn QueueGateway> {
        &self.gateway
    }

    /// Spawns a worker that owns `message` until it is deleted or abandoned.
    pub fn dispatch(&self, address: QueueAddress, message: Message) -> JoinHandle<ProcessingOutcome> {
        let gateway = self.gateway.clone();
        let processor = self.processor.clone();
        let limiter = self.limiter.clone();
        let processing_timeout = self.processing_timeout;

        debug!(message_id = message.message_id(), queue = %address, "dispatching message");

        tokio::spawn(async move {
            // The semaphore is never closed, so acquire only fails if it is.
            let _permit = match limiter {
                Some(limiter) => limiter.acquire_owned().await.ok(),
                None => None,
            };
            consume(
                gateway.as_ref(),
                processor.as_ref(),
                &address,
                message,
                processing_timeout,
            )
            .await
        })
    }

    /// Dispatches every message in `batch`, one worker each.
    pub fn dispatch_batch(
        &self,
        address: &QueueAddress,
        batch: ReceiveBatch,
    ) -> Vec<JoinHandle<ProcessingOutcome>> {
        batch
            .into_iter()
            .map(|message| self.dispatch(address.clone(), message))
            .collect()
    }
}
