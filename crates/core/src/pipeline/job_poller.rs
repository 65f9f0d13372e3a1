use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::remote::domain::job_status::JobStatus;
use crate::remote::domain::video_service::ServiceError;

#[derive(Error, Debug)]
pub enum PollError {
    /// A status request failed. Polling stops; it is not retried.
    #[error(transparent)]
    Transport(#[from] ServiceError),
    /// The loop was cancelled or replaced by a newer watch.
    #[error("polling was superseded")]
    Superseded,
}

/// Polls a job's status at a fixed delay until it reaches a terminal phase.
///
/// At most one loop runs per poller. A new [`watch`](Self::watch) cancels the
/// running loop and waits for it to exit before its own first tick.
/// Cancellation is cooperative: a status request already on the wire runs to
/// completion and its answer is dropped.
pub struct JobPoller {
    interval: Duration,
    active: Mutex<Option<CancellationToken>>,
    slot: tokio::sync::Mutex<()>,
    live_loops: Arc<AtomicUsize>,
}

impl JobPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            active: Mutex::new(None),
            slot: tokio::sync::Mutex::new(()),
            live_loops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of loops currently inside their tick cycle. Never above one.
    pub fn active_loops(&self) -> usize {
        self.live_loops.load(Ordering::SeqCst)
    }

    /// Stops the running loop, if any, at its next suspension point.
    pub fn cancel(&self) {
        if let Some(token) = self.swap_active(None) {
            token.cancel();
        }
    }

    fn swap_active(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *active, next)
    }

    /// Calls `fetch` right away, reports the status to `on_progress`, and
    /// repeats one interval after each answer until the status is terminal.
    ///
    /// Returns the terminal status. A remote `error` phase is returned as a
    /// status like any other terminal phase; interpreting it is up to the
    /// caller.
    pub async fn watch<F, Fut, P>(&self, mut fetch: F, mut on_progress: P) -> Result<JobStatus, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<JobStatus, ServiceError>>,
        P: FnMut(&JobStatus),
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.swap_active(Some(token.clone())) {
            log::debug!("Cancelling previous poll loop");
            previous.cancel();
        }

        let _slot = tokio::select! {
            guard = self.slot.lock() => guard,
            _ = token.cancelled() => return Err(PollError::Superseded),
        };
        let _live = LiveLoop::enter(&self.live_loops);

        let mut polls = 0u32;
        loop {
            if polls > 0 {
                tokio::select! {
                    _ = token.cancelled() => return Err(PollError::Superseded),
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }

            let result = fetch().await;
            polls += 1;
            if token.is_cancelled() {
                log::debug!("Discarding status from cancelled poll loop");
                return Err(PollError::Superseded);
            }
            let status = result.map_err(|e| {
                log::warn!("Status poll {polls} failed: {e}");
                PollError::Transport(e)
            })?;

            on_progress(&status);
            if status.is_terminal() {
                log::debug!("Job reached '{}' after {polls} polls", status.phase);
                return Ok(status);
            }
        }
    }
}

struct LiveLoop {
    counter: Arc<AtomicUsize>,
}

impl LiveLoop {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for LiveLoop {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
