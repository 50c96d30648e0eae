use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Resolved queue address (the queue URL for SQS).
///
/// Resolved once from a queue name and cheap to clone into every worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueAddress(Arc<str>);

impl QueueAddress {
    pub fn new(address: impl Into<Arc<str>>) -> Self {
        QueueAddress(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for QueueAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Delivery-attempt scoped token required to delete a message.
///
/// Deliberately not `Clone`: handing it to
/// [`QueueGateway::delete`](super::QueueGateway::delete) gives it up.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        ReceiptHandle(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A single delivery of a queued message.
#[derive(Debug, Serialize)]
pub struct Message {
    #[serde(rename = "MessageId")]
    message_id: String,

    #[serde(rename = "ReceiptHandle")]
    receipt_handle: ReceiptHandle,

    #[serde(rename = "Body")]
    body: String,

    #[serde(rename = "MD5OfBody", skip_serializing_if = "Option::is_none")]
    md5_of_body: Option<String>,
}

impl Message {
    pub fn new(
        message_id: impl Into<String>,
        receipt_handle: ReceiptHandle,
        body: impl Into<String>,
    ) -> Self {
        Message {
            message_id: message_id.into(),
            receipt_handle,
            body: body.into(),
            md5_of_body: None,
        }
    }

    pub fn with_md5_of_body(mut self, md5: impl Into<String>) -> Self {
        self.md5_of_body = Some(md5.into());
        self
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn receipt_handle(&self) -> &ReceiptHandle {
        &self.receipt_handle
    }

    /// Ends this delivery, giving up the receipt handle for acknowledgment.
    pub fn into_receipt_handle(self) -> ReceiptHandle {
        self.receipt_handle
    }
}

/// Result of one receive call. Owned by whoever issued the call.
#[derive(Debug, Default, Serialize)]
pub struct ReceiveBatch {
    #[serde(rename = "Messages")]
    messages: Vec<Message>,
}

impl ReceiveBatch {
    pub fn new(messages: Vec<Message>) -> Self {
        ReceiveBatch { messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl IntoIterator for ReceiveBatch {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

/// What the queue service returns for a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    #[serde(rename = "MessageId")]
    pub message_id: String,

    #[serde(rename = "MD5OfMessageBody", skip_serializing_if = "Option::is_none")]
    pub md5_of_message_body: Option<String>,

    #[serde(rename = "SequenceNumber", skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,
}
