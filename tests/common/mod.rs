#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rs_sqs_dispatch::errors::{GatewayError, ProcessError};
use rs_sqs_dispatch::gateway::{
    Message, QueueAddress, QueueGateway, ReceiptHandle, ReceiveBatch, ReceiveOptions, SendReceipt,
};
use rs_sqs_dispatch::processor::MessageProcessor;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Receive,
    Send(String),
    ProcessStart(String),
    ProcessOk(String),
    ProcessFailed(String),
    Delete(String),
    DeleteFailed(String),
}

/// Timestamped record of every gateway and processor call, shared between fakes.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<(Instant, Event)>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push((Instant::now(), event));
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn receive_times(&self) -> Vec<Instant> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e)| *e == Event::Receive)
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        let mut deleted: Vec<String> = self
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Delete(receipt) => Some(receipt),
                _ => None,
            })
            .collect();
        deleted.sort();
        deleted
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

pub fn receipt_for(id: &str) -> String {
    format!("rh-{id}")
}

pub fn message(id: &str, body: &str) -> Message {
    Message::new(id, ReceiptHandle::new(receipt_for(id)), body)
}

type ScriptedReceive = Result<Vec<(String, String)>, GatewayError>;

/// In-memory gateway. Receives follow a script, then return empty batches.
pub struct FakeGateway {
    log: EventLog,
    queues: HashMap<String, QueueAddress>,
    receives: Mutex<VecDeque<ScriptedReceive>>,
    failing_deletes: Mutex<HashSet<String>>,
    send_error: Mutex<Option<GatewayError>>,
    sent: AtomicUsize,
    receive_delay: Duration,
    receives_in_flight: AtomicUsize,
    max_receives_in_flight: AtomicUsize,
}

impl FakeGateway {
    pub fn new(log: EventLog) -> Self {
        FakeGateway {
            log,
            queues: HashMap::new(),
            receives: Mutex::new(VecDeque::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            send_error: Mutex::new(None),
            sent: AtomicUsize::new(0),
            receive_delay: Duration::ZERO,
            receives_in_flight: AtomicUsize::new(0),
            max_receives_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every receive takes `delay` before returning.
    pub fn with_receive_delay(mut self, delay: Duration) -> Self {
        self.receive_delay = delay;
        self
    }

    /// Highest number of receives that were in progress at the same time.
    pub fn max_concurrent_receives(&self) -> usize {
        self.max_receives_in_flight.load(Ordering::SeqCst)
    }

    pub fn with_queue(mut self, name: &str) -> Self {
        self.queues
            .insert(name.to_string(), address_of(name));
        self
    }

    pub fn push_batch(&self, messages: &[(&str, &str)]) {
        self.receives.lock().unwrap().push_back(Ok(messages
            .iter()
            .map(|(id, body)| (id.to_string(), body.to_string()))
            .collect()));
    }

    pub fn push_error(&self, err: GatewayError) {
        self.receives.lock().unwrap().push_back(Err(err));
    }

    pub fn fail_delete_for(&self, id: &str) {
        self.failing_deletes.lock().unwrap().insert(receipt_for(id));
    }

    pub fn fail_sends_with(&self, err: GatewayError) {
        *self.send_error.lock().unwrap() = Some(err);
    }
}

pub fn address_of(name: &str) -> QueueAddress {
    QueueAddress::new(format!("https://sqs.test.local/000000000000/{name}"))
}

#[async_trait]
impl QueueGateway for FakeGateway {
    async fn resolve_address(&self, queue_name: &str) -> Result<QueueAddress, GatewayError> {
        self.queues
            .get(queue_name)
            .cloned()
            .ok_or_else(|| GatewayError::QueueNotFound(queue_name.to_string()))
    }

    async fn send(
        &self,
        _address: &QueueAddress,
        body: &str,
        _delay: Duration,
    ) -> Result<SendReceipt, GatewayError> {
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.log.push(Event::Send(body.to_string()));
        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SendReceipt {
            message_id: format!("sent-{n}"),
            md5_of_message_body: None,
            sequence_number: None,
        })
    }

    async fn receive(
        &self,
        _address: &QueueAddress,
        options: ReceiveOptions,
    ) -> Result<ReceiveBatch, GatewayError> {
        self.log.push(Event::Receive);
        let in_flight = self.receives_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_receives_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);
        if !self.receive_delay.is_zero() {
            tokio::time::sleep(self.receive_delay).await;
        }
        self.receives_in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.receives.lock().unwrap().pop_front();
        match next {
            Some(Ok(messages)) => Ok(ReceiveBatch::new(
                messages
                    .iter()
                    .take(options.max_messages as usize)
                    .map(|(id, body)| message(id, body))
                    .collect(),
            )),
            Some(Err(err)) => Err(err),
            None => Ok(ReceiveBatch::default()),
        }
    }

    async fn delete(
        &self,
        _address: &QueueAddress,
        receipt_handle: ReceiptHandle,
    ) -> Result<(), GatewayError> {
        let receipt = receipt_handle.into_inner();
        if self.failing_deletes.lock().unwrap().contains(&receipt) {
            self.log.push(Event::DeleteFailed(receipt.clone()));
            return Err(GatewayError::transport("DeleteMessage", "connection reset"));
        }
        self.log.push(Event::Delete(receipt));
        Ok(())
    }
}

/// Processor with per-message delays and failures.
pub struct RecordingProcessor {
    log: EventLog,
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    failures: HashMap<String, ProcessError>,
}

impl RecordingProcessor {
    pub fn new(log: EventLog) -> Self {
        RecordingProcessor {
            log,
            default_delay: Duration::from_secs(1),
            delays: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub fn failing(mut self, id: &str, err: ProcessError) -> Self {
        self.failures.insert(id.to_string(), err);
        self
    }
}

#[async_trait]
impl MessageProcessor for RecordingProcessor {
    async fn process(&self, message: &Message) -> Result<(), ProcessError> {
        let id = message.message_id().to_string();
        self.log.push(Event::ProcessStart(id.clone()));

        let delay = self.delays.get(&id).copied().unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        if let Some(err) = self.failures.get(&id) {
            self.log.push(Event::ProcessFailed(id));
            return Err(err.clone());
        }

        self.log.push(Event::ProcessOk(id));
        Ok(())
    }
}
