use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use tracing::{debug, warn};

use super::{
    Message, QueueAddress, QueueGateway, ReceiptHandle, ReceiveBatch, ReceiveOptions, SendReceipt,
};
use crate::errors::GatewayError;

/// [`QueueGateway`] backed by an `aws_sdk_sqs::Client`.
///
/// The SDK client is internally reference counted, so cloning the gateway is
/// cheap and every clone shares one connection pool.
#[derive(Clone, Debug)]
pub struct SqsGateway {
    sqs_client: aws_sdk_sqs::Client,
}

impl SqsGateway {
    pub fn new(sqs_client: aws_sdk_sqs::Client) -> Self {
        SqsGateway { sqs_client }
    }
}

fn whole_seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

/// Converts an SDK message, dropping it if it can never be acknowledged.
fn message_from_sdk(message: aws_sdk_sqs::types::Message) -> Option<Message> {
    let Some(receipt_handle) = message.receipt_handle else {
        warn!(
            message_id = message.message_id.as_deref().unwrap_or("unknown"),
            "received a message without a receipt handle; skipping"
        );
        return None;
    };

    let converted = Message::new(
        message.message_id.unwrap_or_default(),
        ReceiptHandle::new(receipt_handle),
        message.body.unwrap_or_default(),
    );

    Some(match message.md5_of_body {
        Some(md5) => converted.with_md5_of_body(md5),
        None => converted,
    })
}

#[async_trait]
impl QueueGateway for SqsGateway {
    async fn resolve_address(&self, queue_name: &str) -> Result<QueueAddress, GatewayError> {
        let output = self
            .sqs_client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_queue_does_not_exist())
                {
                    GatewayError::QueueNotFound(queue_name.to_string())
                } else {
                    GatewayError::transport("GetQueueUrl", DisplayErrorContext(&err).to_string())
                }
            })?;

        let url = output
            .queue_url()
            .ok_or_else(|| GatewayError::QueueNotFound(queue_name.to_string()))?;

        debug!(queue_name, queue_url = url, "resolved queue address");
        Ok(QueueAddress::new(url))
    }

    async fn send(
        &self,
        address: &QueueAddress,
        body: &str,
        delay: Duration,
    ) -> Result<SendReceipt, GatewayError> {
        let output = self
            .sqs_client
            .send_message()
            .queue_url(address.as_str())
            .message_body(body)
            .delay_seconds(whole_seconds(delay))
            .send()
            .await
            .map_err(|err| {
                GatewayError::transport("SendMessage", DisplayErrorContext(&err).to_string())
            })?;

        Ok(SendReceipt {
            message_id: output.message_id().unwrap_or_default().to_string(),
            md5_of_message_body: output.md5_of_message_body().map(str::to_string),
            sequence_number: output.sequence_number().map(str::to_string),
        })
    }

    async fn receive(
        &self,
        address: &QueueAddress,
        options: ReceiveOptions,
    ) -> Result<ReceiveBatch, GatewayError> {
        let output = self
            .sqs_client
            .receive_message()
            .queue_url(address.as_str())
            .max_number_of_messages(options.max_messages)
            .visibility_timeout(whole_seconds(options.visibility_timeout))
            .wait_time_seconds(whole_seconds(options.wait_time))
            .send()
            .await
            .map_err(|err| {
                GatewayError::transport("ReceiveMessage", DisplayErrorContext(&err).to_string())
            })?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(message_from_sdk)
            .collect();

        Ok(ReceiveBatch::new(messages))
    }

    async fn delete(
        &self,
        address: &QueueAddress,
        receipt_handle: ReceiptHandle,
    ) -> Result<(), GatewayError> {
        self.sqs_client
            .delete_message()
            .queue_url(address.as_str())
            .receipt_handle(receipt_handle.into_inner())
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_receipt_handle_is_invalid())
                {
                    GatewayError::ReceiptExpired(DisplayErrorContext(&err).to_string())
                } else {
                    GatewayError::transport("DeleteMessage", DisplayErrorContext(&err).to_string())
                }
            })?;

        Ok(())
    }
}
