use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::PollConfig;
use super::dispatch::Dispatcher;
use super::poll::run_poll;
use crate::errors::{GatewayError, PollError};
use crate::gateway::QueueAddress;

/// Lifecycle of one polled queue: its stop token and the loop task.
///
/// `finished` is cancelled once `run_poll` has returned, so no receive for
/// the queue can still be in progress after that.
struct PollState {
    cancel: CancellationToken,
    finished: CancellationToken,
    handle: JoinHandle<Result<(), PollError>>,
}

impl PollState {
    fn is_running(&self) -> bool {
        !self.finished.is_cancelled()
    }

    /// Running and not asked to stop.
    fn is_active(&self) -> bool {
        self.is_running() && !self.cancel.is_cancelled()
    }

    /// Asked to stop, but the loop has not returned yet.
    fn is_stopping(&self) -> bool {
        self.is_running() && self.cancel.is_cancelled()
    }
}

/// Keeps exactly one poll loop per queue.
///
/// Every loop's token is a child of the registry's shutdown token, so
/// cancelling that token (or calling [`PollRegistry::shutdown`]) stops all of
/// them.
pub struct PollRegistry {
    dispatcher: Dispatcher,
    config: PollConfig,
    shutdown: CancellationToken,
    polls: Mutex<HashMap<QueueAddress, PollState>>,
}

impl PollRegistry {
    pub fn new(dispatcher: Dispatcher, config: PollConfig) -> Self {
        PollRegistry::with_shutdown_token(dispatcher, config, CancellationToken::new())
    }

    pub fn with_shutdown_token(
        dispatcher: Dispatcher,
        config: PollConfig,
        shutdown: CancellationToken,
    ) -> Self {
        PollRegistry {
            dispatcher,
            config,
            shutdown,
            polls: Mutex::new(HashMap::new()),
        }
    }

    fn polls(&self) -> MutexGuard<'_, HashMap<QueueAddress, PollState>> {
        self.polls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves `queue_name` and starts polling it unless already polled.
    ///
    /// If a previous loop for the queue was stopped but is still finishing
    /// its last receive, this waits for it to return before starting anew.
    pub async fn start(&self, queue_name: &str) -> Result<QueueAddress, GatewayError> {
        let address = self.dispatcher.gateway().resolve_address(queue_name).await?;
        self.finish_stopping(&address).await;
        self.start_address(address.clone());
        Ok(address)
    }

    /// Starts polling `address`. Returns `false` if a loop for it is still
    /// running, including one that was stopped and has not returned yet.
    pub fn start_address(&self, address: QueueAddress) -> bool {
        let mut polls = self.polls();
        if let Some(state) = polls.get(&address).filter(|state| state.is_running()) {
            if state.is_stopping() {
                debug!(queue = %address, "previous poll loop still finishing");
            }
            return false;
        }

        let cancel = self.shutdown.child_token();
        let finished = CancellationToken::new();
        let poll = run_poll(
            self.dispatcher.clone(),
            address.clone(),
            self.config.clone(),
            cancel.clone(),
        );
        let done = finished.clone().drop_guard();
        let handle = tokio::spawn(async move {
            let _done = done;
            poll.await
        });

        info!(queue = %address, "started polling");
        polls.insert(address, PollState { cancel, finished, handle });
        true
    }

    /// Waits for a stopped loop for `address` to return. Returns at once if
    /// there is no loop or it is still active.
    async fn finish_stopping(&self, address: &QueueAddress) {
        loop {
            let finished = match self.polls().get(address) {
                Some(state) if state.is_stopping() => state.finished.clone(),
                _ => return,
            };
            finished.cancelled().await;
        }
    }

    /// Signals the loop for `address` to stop. Returns `false` if none was
    /// running or it had already been asked to stop.
    ///
    /// The entry stays registered until the loop returns, so a restart
    /// cannot overlap a receive that is still in progress.
    pub fn stop(&self, address: &QueueAddress) -> bool {
        match self.polls().get(address) {
            Some(state) => {
                let active = state.is_active();
                state.cancel.cancel();
                info!(queue = %address, "stop requested");
                active
            }
            None => false,
        }
    }

    /// Resolves `queue_name` and stops its loop.
    pub async fn stop_queue(&self, queue_name: &str) -> Result<bool, GatewayError> {
        let address = self.dispatcher.gateway().resolve_address(queue_name).await?;
        Ok(self.stop(&address))
    }

    /// Signals every loop to stop. Returns how many were active.
    pub fn stop_all(&self) -> usize {
        let mut polls = self.polls();
        polls.retain(|_, state| state.is_running());
        let running = polls.values().filter(|state| state.is_active()).count();
        for state in polls.values() {
            state.cancel.cancel();
        }
        info!(running, "stop requested for all poll loops");
        running
    }

    /// `true` while a loop for `address` runs and has not been asked to stop.
    pub fn is_polling(&self, address: &QueueAddress) -> bool {
        self.polls().get(address).is_some_and(PollState::is_active)
    }

    /// Addresses with an active loop.
    pub fn active(&self) -> Vec<QueueAddress> {
        let mut active: Vec<QueueAddress> = self
            .polls()
            .iter()
            .filter(|(_, state)| state.is_active())
            .map(|(address, _)| address.clone())
            .collect();
        active.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        active
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancels all loops and waits for them to return. In-flight workers
    /// are not awaited.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let states: Vec<(QueueAddress, PollState)> = self.polls().drain().collect();

        let results = join_all(states.into_iter().map(|(address, state)| async move {
            (address, state.handle.await)
        }))
        .await;

        for (address, result) in results {
            match result {
                Ok(Ok(())) => info!(queue = %address, "poll loop stopped"),
                Ok(Err(err)) => warn!(queue = %address, error = %err, "poll loop had already failed"),
                Err(join_err) => warn!(queue = %address, error = %join_err, "poll loop task panicked"),
            }
        }
    }
}
