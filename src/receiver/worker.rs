use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::errors::{GatewayError, ProcessError};
use crate::gateway::{Message, QueueAddress, QueueGateway};
use crate::processor::MessageProcessor;

/// Where a single delivery ended up.
///
/// `Acknowledged` and `AbandonedForRetry` are terminal for this delivery.
/// `AcknowledgeFailed` is not: the message was processed but is still on the
/// queue and will be delivered (and processed) again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Processed and deleted.
    Acknowledged,

    /// Processing failed; the message was left for queue-native redelivery.
    AbandonedForRetry(ProcessError),

    /// Processing succeeded but the delete call failed.
    AcknowledgeFailed(GatewayError),
}

impl ProcessingOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessingOutcome::AcknowledgeFailed(_))
    }

    pub fn deleted(&self) -> bool {
        matches!(self, ProcessingOutcome::Acknowledged)
    }
}

/// Processes one message and deletes it only if processing succeeded.
///
/// Takes the message by value: once this returns, the receipt handle has
/// either been spent on a delete or dropped with the message.
#[instrument(
    name = "consume",
    skip_all,
    fields(message_id = message.message_id(), queue = %address)
)]
pub async fn consume(
    gateway: &dyn QueueGateway,
    processor: &dyn MessageProcessor,
    address: &QueueAddress,
    message: Message,
    processing_timeout: Option<Duration>,
) -> ProcessingOutcome {
    let result = match processing_timeout {
        Some(limit) => match tokio::time::timeout(limit, processor.process(&message)).await {
            Ok(result) => result,
            Err(_) => Err(ProcessError::Transient(format!(
                "processing exceeded {}s deadline",
                limit.as_secs_f64()
            ))),
        },
        None => processor.process(&message).await,
    };

    if let Err(err) = result {
        if err.is_transient() {
            warn!(error = %err, "processing failed; leaving message for redelivery");
        } else {
            error!(error = %err, "processing failed permanently; leaving message for dead-letter policy");
        }
        return ProcessingOutcome::AbandonedForRetry(err);
    }

    match gateway.delete(address, message.into_receipt_handle()).await {
        Ok(()) => {
            info!("deleted message");
            ProcessingOutcome::Acknowledged
        }
        Err(err) => {
            warn!(error = %err, "deletion failed after successful processing; message will be reprocessed");
            ProcessingOutcome::AcknowledgeFailed(err)
        }
    }
}
