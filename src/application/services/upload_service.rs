//! Upload workflow: validate, send, then track processing until a terminal
//! status.
//!
//! Phases move `idle → uploading → processing → completed | error`, and
//! `completed` falls back to `idle` after a short display delay. Progress
//! while uploading is a timer-driven estimate, not transferred bytes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{DocumentBackend, PollEvent, PollHandle, StatusPoller};
use crate::{
    application::dtos::UploadFile,
    domain::{DocumentStatus, DomainError, ALLOWED_MEDIA_TYPES, MAX_UPLOAD_BYTES},
};

pub const UNSUPPORTED_TYPE_MESSAGE: &str =
    "Unsupported file type. Please upload PDF, DOCX, or TXT files.";
pub const FILE_TOO_LARGE_MESSAGE: &str = "File size exceeds 50MB limit.";
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";
pub const PROCESSING_FAILED_MESSAGE: &str = "Document processing failed. Please try again.";
/// Passed to [`UploadObserver::on_error`] when the backend reports `failed`.
pub const PROCESSING_FAILED_NOTICE: &str = "Document processing failed";
pub const PROCESSING_TIMEOUT_MESSAGE: &str = "Document processing timed out. Please try again.";
pub const UPLOAD_IN_PROGRESS_MESSAGE: &str = "An upload is already in progress.";

pub const DEFAULT_COMPLETION_DISPLAY: Duration = Duration::from_millis(2000);
const PROGRESS_TICK: Duration = Duration::from_millis(200);
const PROGRESS_STEP: u8 = 10;
const PROGRESS_CEILING: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Uploading,
    Processing,
    Completed,
    Error,
}

/// Upload progress as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadProgress {
    /// Timer-driven estimate; never exceeds 90 before the backend answers.
    Estimated(u8),
    /// The backend accepted the file.
    Done,
}

impl UploadProgress {
    pub fn percent(self) -> u8 {
        match self {
            UploadProgress::Estimated(pct) => pct,
            UploadProgress::Done => 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub phase: UploadPhase,
    pub progress: UploadProgress,
    pub document_id: Option<String>,
    pub error: Option<String>,
}

impl Default for UploadSnapshot {
    fn default() -> Self {
        Self {
            phase: UploadPhase::Idle,
            progress: UploadProgress::Estimated(0),
            document_id: None,
            error: None,
        }
    }
}

/// Client-side entry guard for uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub allowed_media_types: Vec<String>,
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_media_types: ALLOWED_MEDIA_TYPES.iter().map(|t| t.to_string()).collect(),
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn validate(&self, file: &UploadFile) -> Result<(), DomainError> {
        if !self
            .allowed_media_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&file.media_type))
        {
            return Err(DomainError::validation(UNSUPPORTED_TYPE_MESSAGE));
        }
        if file.size > self.max_bytes {
            return Err(DomainError::validation(FILE_TOO_LARGE_MESSAGE));
        }
        Ok(())
    }
}

/// Callbacks fired by the orchestrator. They run on runtime tasks and must
/// not block.
pub trait UploadObserver: Send + Sync {
    fn on_change(&self, _snapshot: &UploadSnapshot) {}

    fn on_complete(&self, document_id: &str);

    fn on_error(&self, error: &DomainError, message: &str);
}

/// Accepted upload. Dropping `poll` stops tracking the document.
pub struct UploadReceipt {
    pub document_id: String,
    pub poll: PollHandle,
}

struct Shared {
    state: Mutex<UploadSnapshot>,
    generation: AtomicU64,
    observer: Arc<dyn UploadObserver>,
}

impl Shared {
    /// Apply `update` and notify on change. With `Some(generation)` the
    /// update is skipped once a newer upload has started.
    fn mutate(
        &self,
        generation: Option<u64>,
        update: impl FnOnce(&mut UploadSnapshot) -> bool,
    ) -> bool {
        let snapshot = {
            let mut state = self.state.lock();
            if let Some(expected) = generation {
                if self.generation.load(Ordering::SeqCst) != expected {
                    return false;
                }
            }
            if !update(&mut state) {
                return false;
            }
            state.clone()
        };
        self.observer.on_change(&snapshot);
        true
    }

    fn begin(&self) -> Option<u64> {
        let (generation, snapshot) = {
            let mut state = self.state.lock();
            if state.phase == UploadPhase::Uploading {
                return None;
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = UploadSnapshot {
                phase: UploadPhase::Uploading,
                ..UploadSnapshot::default()
            };
            (generation, state.clone())
        };
        self.observer.on_change(&snapshot);
        Some(generation)
    }

    fn fail(
        &self,
        generation: Option<u64>,
        phase: Option<UploadPhase>,
        err: &DomainError,
        message: &str,
    ) {
        self.fail_with_notice(generation, phase, err, message, message);
    }

    /// Like [`Shared::fail`], but the observer gets `notice` instead of the
    /// banner stored in the snapshot.
    fn fail_with_notice(
        &self,
        generation: Option<u64>,
        phase: Option<UploadPhase>,
        err: &DomainError,
        banner: &str,
        notice: &str,
    ) {
        self.mutate(generation, |state| {
            if let Some(phase) = phase {
                state.phase = phase;
            }
            state.error = Some(banner.to_string());
            true
        });
        self.observer.on_error(err, notice);
    }
}

/// Held across the upload request. If `submit` is dropped before the backend
/// answers, the area returns to `idle` so later uploads are not locked out.
struct InFlight {
    shared: Arc<Shared>,
    generation: u64,
    armed: bool,
}

impl InFlight {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let reset = self.shared.mutate(Some(self.generation), |state| {
            if state.phase != UploadPhase::Uploading {
                return false;
            }
            *state = UploadSnapshot::default();
            true
        });
        if reset {
            info!(
                target: "documind::upload",
                generation = self.generation,
                "upload abandoned before the backend answered"
            );
        }
    }
}

/// Drives one upload area. Dropping the orchestrator cancels every poll
/// loop and timer it started.
pub struct UploadOrchestrator {
    backend: Arc<dyn DocumentBackend>,
    poller: StatusPoller,
    policy: UploadPolicy,
    display_delay: Duration,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
}

impl UploadOrchestrator {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        poller: StatusPoller,
        observer: Arc<dyn UploadObserver>,
    ) -> Self {
        Self {
            backend,
            poller,
            policy: UploadPolicy::default(),
            display_delay: DEFAULT_COMPLETION_DISPLAY,
            shared: Arc::new(Shared {
                state: Mutex::new(UploadSnapshot::default()),
                generation: AtomicU64::new(0),
                observer,
            }),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_display_delay(mut self, delay: Duration) -> Self {
        self.display_delay = delay;
        self
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        self.shared.state.lock().clone()
    }

    /// Validate and upload `file`, then start tracking its processing.
    ///
    /// Validation failures are reported through the observer and leave the
    /// phase untouched. Upload failures move to `error` without polling.
    pub async fn submit(&self, file: UploadFile) -> Result<UploadReceipt, DomainError> {
        if let Err(err) = self.policy.validate(&file) {
            let message = err.banner(UPLOAD_FAILED_MESSAGE);
            info!(
                target: "documind::upload",
                filename = %file.filename,
                media_type = %file.media_type,
                size = file.size,
                "upload rejected: {message}"
            );
            self.shared.fail(None, None, &err, &message);
            return Err(err);
        }

        let generation = self
            .shared
            .begin()
            .ok_or_else(|| DomainError::validation(UPLOAD_IN_PROGRESS_MESSAGE))?;

        let ticker = self.shutdown.child_token();
        tokio::spawn(estimate_progress(
            Arc::clone(&self.shared),
            generation,
            ticker.clone(),
        ));
        let ticker_guard = ticker.drop_guard();
        let in_flight = InFlight {
            shared: Arc::clone(&self.shared),
            generation,
            armed: true,
        };
        let uploaded = self.backend.upload_document(&file).await;
        in_flight.disarm();
        drop(ticker_guard);

        let response = match uploaded {
            Ok(response) => response,
            Err(err) => {
                let message = err.banner(UPLOAD_FAILED_MESSAGE);
                warn!(
                    target: "documind::upload",
                    filename = %file.filename,
                    "upload failed: {err}"
                );
                self.shared
                    .fail(Some(generation), Some(UploadPhase::Error), &err, &message);
                return Err(err);
            }
        };

        let document_id = response.document_id;
        info!(
            target: "documind::upload",
            document_id = %document_id,
            filename = %response.filename,
            "upload accepted, tracking processing"
        );
        self.shared.mutate(Some(generation), |state| {
            state.phase = UploadPhase::Processing;
            state.progress = UploadProgress::Done;
            state.document_id = Some(document_id.clone());
            true
        });

        let poll = self.poller.spawn_with_token(
            document_id.clone(),
            self.shutdown.child_token(),
            track_processing(
                Arc::clone(&self.shared),
                generation,
                document_id.clone(),
                self.display_delay,
                self.shutdown.clone(),
            ),
        );

        Ok(UploadReceipt { document_id, poll })
    }

    /// Leave the `error` phase without resubmitting. Returns whether the
    /// phase changed.
    pub fn retry(&self) -> bool {
        self.shared.mutate(None, |state| {
            if state.phase != UploadPhase::Error {
                return false;
            }
            *state = UploadSnapshot::default();
            true
        })
    }
}

impl Drop for UploadOrchestrator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn estimate_progress(shared: Arc<Shared>, generation: u64, token: CancellationToken) {
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(PROGRESS_TICK) => {}
        }

        let advanced = shared.mutate(Some(generation), |state| match state.progress {
            UploadProgress::Estimated(pct)
                if state.phase == UploadPhase::Uploading && pct < PROGRESS_CEILING =>
            {
                state.progress =
                    UploadProgress::Estimated((pct + PROGRESS_STEP).min(PROGRESS_CEILING));
                true
            }
            _ => false,
        });
        if !advanced {
            return;
        }
    }
}

fn track_processing(
    shared: Arc<Shared>,
    generation: u64,
    document_id: String,
    display_delay: Duration,
    shutdown: CancellationToken,
) -> impl FnMut(PollEvent) + Send + 'static {
    move |event| match event {
        PollEvent::Status(DocumentStatus::Completed) => {
            shared.mutate(Some(generation), |state| {
                state.phase = UploadPhase::Completed;
                true
            });
            info!(
                target: "documind::upload",
                document_id = %document_id,
                "document processed"
            );
            shared.observer.on_complete(&document_id);

            let shared = Arc::clone(&shared);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = tokio::time::sleep(display_delay) => {
                        shared.mutate(Some(generation), |state| {
                            if state.phase != UploadPhase::Completed {
                                return false;
                            }
                            *state = UploadSnapshot::default();
                            true
                        });
                    }
                }
            });
        }
        PollEvent::Status(DocumentStatus::Failed) => {
            let err = DomainError::ProcessingFailure {
                document_id: document_id.clone(),
            };
            shared.fail_with_notice(
                Some(generation),
                Some(UploadPhase::Error),
                &err,
                PROCESSING_FAILED_MESSAGE,
                PROCESSING_FAILED_NOTICE,
            );
        }
        PollEvent::TimedOut { attempts } => {
            let err = DomainError::PollTimeout {
                document_id: document_id.clone(),
                attempts,
            };
            shared.fail(
                Some(generation),
                Some(UploadPhase::Error),
                &err,
                PROCESSING_TIMEOUT_MESSAGE,
            );
        }
        PollEvent::Status(DocumentStatus::Uploading | DocumentStatus::Processing) => {}
    }
}
