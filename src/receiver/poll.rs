use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::backoff::ExponentialBackoff;
use super::config::{PollConfig, ReceiveFailurePolicy};
use super::dispatch::Dispatcher;
use crate::errors::PollError;
use crate::gateway::QueueAddress;

/// Sleeps for `duration` unless `cancel` fires first. Returns `false` on cancel.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Continuously drains `address` until `cancel` fires.
///
/// Each iteration receives one batch and hands every message to its own
/// worker through `dispatcher`, then sleeps `inter_batch_delay` without
/// waiting for those workers. An empty batch sleeps `empty_backoff` instead.
/// Receive errors are handled per `config.failure_policy`.
///
/// Returns `Ok(())` when cancelled. Workers already dispatched keep running
/// after the loop returns; nothing here awaits or aborts them, so they may
/// be cut short if the process exits right after.
#[instrument(name = "poll", skip_all, fields(queue = %address))]
pub async fn run_poll(
    dispatcher: Dispatcher,
    address: QueueAddress,
    config: PollConfig,
    cancel: CancellationToken,
) -> Result<(), PollError> {
    let mut backoff = match &config.failure_policy {
        ReceiveFailurePolicy::Retry { backoff, .. } => Some(ExponentialBackoff::new(backoff.clone())),
        ReceiveFailurePolicy::Stop => None,
    };
    let mut consecutive_failures = 0u32;

    info!("poll loop started");

    loop {
        if cancel.is_cancelled() {
            info!("poll loop cancelled");
            return Ok(());
        }

        let batch = match dispatcher.gateway().receive(&address, config.receive).await {
            Ok(batch) => {
                consecutive_failures = 0;
                if let Some(backoff) = backoff.as_mut() {
                    backoff.reset();
                }
                batch
            }
            Err(err) => match (&config.failure_policy, backoff.as_mut()) {
                (
                    ReceiveFailurePolicy::Retry {
                        max_consecutive_failures,
                        ..
                    },
                    Some(backoff),
                ) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= (*max_consecutive_failures).max(1) {
                        error!(error = %err, attempts = consecutive_failures, "receive keeps failing; stopping poll loop");
                        return Err(PollError::TooManyFailures {
                            attempts: consecutive_failures,
                            last: err,
                        });
                    }

                    let delay = backoff.next_delay();
                    warn!(
                        error = %err,
                        attempts = consecutive_failures,
                        retry_in_ms = delay.as_millis() as u64,
                        "receive failed; retrying"
                    );
                    if !pause(&cancel, delay).await {
                        info!("poll loop cancelled");
                        return Ok(());
                    }
                    continue;
                }
                _ => {
                    error!(error = %err, "receive failed; stopping poll loop");
                    return Err(PollError::Receive(err));
                }
            },
        };

        let wait = if batch.is_empty() {
            debug!("no messages received");
            config.empty_backoff
        } else {
            info!(count = batch.len(), "messages received");
            let workers = dispatcher.dispatch_batch(&address, batch);
            debug!(workers = workers.len(), "batch dispatched");
            config.inter_batch_delay
        };

        if !pause(&cancel, wait).await {
            info!("poll loop cancelled");
            return Ok(());
        }
    }
}
