//! Fixed-interval document status polling.
//!
//! One spawned task per poll loop. Fetches inside a loop are strictly
//! sequential: the next one is scheduled only after the previous one
//! resolved. Loops for the same document are not deduplicated.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::DocumentBackend;
use crate::domain::DocumentStatus;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Attempt budget and spacing for one poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

/// Delivered to the caller's callback while a loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// A status fetched from the backend, terminal or not.
    Status(DocumentStatus),
    /// The budget ran out without a terminal status. Emitted once, last.
    TimedOut { attempts: u32 },
}

/// How a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed,
    TimedOut { attempts: u32 },
    Cancelled,
}

/// Owned handle to a running poll loop. Dropping it cancels the loop.
pub struct PollHandle {
    document_id: String,
    token: CancellationToken,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    /// Stop the loop at its next suspension point.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to end.
    pub async fn outcome(mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    target: "documind::poller",
                    document_id = %self.document_id,
                    "poll task aborted: {err}"
                );
                PollOutcome::Cancelled
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawns poll loops against a backend.
#[derive(Clone)]
pub struct StatusPoller {
    backend: Arc<dyn DocumentBackend>,
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(backend: Arc<dyn DocumentBackend>, config: PollConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Start polling `document_id`; `on_event` sees every observed status
    /// and, on budget exhaustion, a final [`PollEvent::TimedOut`].
    pub fn spawn<F>(&self, document_id: impl Into<String>, on_event: F) -> PollHandle
    where
        F: FnMut(PollEvent) + Send + 'static,
    {
        self.spawn_with_token(document_id, CancellationToken::new(), on_event)
    }

    /// Like [`StatusPoller::spawn`], cancelled as well when `token` is.
    pub fn spawn_with_token<F>(
        &self,
        document_id: impl Into<String>,
        token: CancellationToken,
        on_event: F,
    ) -> PollHandle
    where
        F: FnMut(PollEvent) + Send + 'static,
    {
        let document_id = document_id.into();
        let task = tokio::spawn(run_poll_loop(
            Arc::clone(&self.backend),
            document_id.clone(),
            self.config,
            token.clone(),
            on_event,
        ));

        PollHandle {
            document_id,
            token,
            task: Some(task),
        }
    }
}

async fn run_poll_loop<F>(
    backend: Arc<dyn DocumentBackend>,
    document_id: String,
    config: PollConfig,
    token: CancellationToken,
    mut on_event: F,
) -> PollOutcome
where
    F: FnMut(PollEvent) + Send,
{
    let budget = config.max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => return PollOutcome::Cancelled,
            result = backend.get_document(&document_id) => result,
        };
        attempts += 1;

        match fetched {
            Ok(document) => {
                debug!(
                    target: "documind::poller",
                    document_id = %document_id,
                    status = %document.status,
                    attempt = attempts,
                    "status observed"
                );
                on_event(PollEvent::Status(document.status));
                match document.status {
                    DocumentStatus::Completed => return PollOutcome::Completed,
                    DocumentStatus::Failed => return PollOutcome::Failed,
                    DocumentStatus::Uploading | DocumentStatus::Processing => {}
                }
            }
            Err(err) => {
                warn!(
                    target: "documind::poller",
                    document_id = %document_id,
                    attempt = attempts,
                    "status check failed: {err}"
                );
            }
        }

        if attempts >= budget {
            warn!(
                target: "documind::poller",
                document_id = %document_id,
                attempts,
                "document processing timeout"
            );
            on_event(PollEvent::TimedOut { attempts });
            return PollOutcome::TimedOut { attempts };
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => return PollOutcome::Cancelled,
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}
