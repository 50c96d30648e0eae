//! The asynchronous consumption pipeline.
//!
//! [`poll::run_poll`] drains a queue until cancelled, [`Dispatcher`] fans each
//! received message out to its own [`worker::consume`] task, and
//! [`PollRegistry`] owns the one running loop per queue.

pub mod backoff;
pub mod config;
mod dispatch;
pub mod poll;
mod registry;
pub mod worker;

pub use config::{PollConfig, ReceiveFailurePolicy, WorkerConfig};
pub use dispatch::Dispatcher;
pub use poll::run_poll;
pub use registry::PollRegistry;
pub use worker::{ProcessingOutcome, consume};
