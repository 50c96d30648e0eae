//! # SQS Dispatch
//!
//! Bridges an HTTP producer/consumer surface to AWS SQS and runs standing
//! poll loops that drain queues with at-least-once semantics.
//!
//! ## Features
//!
//! - Cancellable poll loop with empty-queue backoff and an inter-batch delay
//! - One concurrent worker per received message, optionally bounded
//! - Messages deleted only after successful processing
//! - Pluggable, idempotent [`processor::MessageProcessor`] capability
//! - Explicit retry-or-stop policy for receive failures
//! - `POST /message` / `GET /message` HTTP surface built on axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rs_sqs_dispatch::{
//!     client::create_sqs_client_from_env,
//!     gateway::{QueueGateway, SqsGateway},
//!     processor::SimulatedProcessor,
//!     receiver::{Dispatcher, PollConfig, WorkerConfig, run_poll},
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Arc::new(SqsGateway::new(create_sqs_client_from_env().await));
//!     let address = gateway.resolve_address("queue1").await?;
//!
//!     let processor = Arc::new(SimulatedProcessor::new(Duration::from_secs(1)));
//!     let dispatcher = Dispatcher::new(gateway, processor, &WorkerConfig::default());
//!
//!     let cancel = CancellationToken::new();
//!     run_poll(dispatcher, address, PollConfig::default(), cancel).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod processor;
pub mod receiver;
pub mod telemetry;
