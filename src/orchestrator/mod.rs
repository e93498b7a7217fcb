//! Lifecycle of generation attempts for one session.
//!
//! The session moves between [`GenerationState`]s:
//!
//! - idle → loading on [`Orchestrator::start`] with valid inputs, or
//!   idle → error when inputs or credentials are rejected (no network call)
//! - loading → success | error when the gateway answers
//! - loading → idle on [`Orchestrator::cancel`]
//! - error → loading on [`Orchestrator::retry`] (retryable errors only)
//! - error → idle on [`Orchestrator::dismiss`]
//! - success → idle on [`Orchestrator::generate_another`]
//!
//! Each attempt gets an id. Stage timers and gateway completions carry the id
//! they were spawned for and are ignored once the session has moved on.

mod state;

pub use state::{GenerationState, LoadingStage, LoadingStatus, StageSchedule};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::{classify, ErrorState};
use crate::gateway::{GatewayOutcome, GenerationGateway};
use crate::normalize::ResultNormalizer;
use crate::output::{export_result, DownloadOptions};
use crate::ports::RawError;
use crate::request::{build_request, BodyData, GenerationRequest};
use crate::upload::UploadedImage;
use crate::validate::{validate_image, FileValidationError};

/// Inputs of an attempt, owned by the caller and reused on retry.
#[derive(Debug, Clone, Default)]
pub struct GenerationInputs {
    /// Photo of the person.
    pub person: Option<UploadedImage>,
    /// Photo of the garment.
    pub clothing: Option<UploadedImage>,
    /// Optional body measurements.
    pub body_data: Option<BodyData>,
}

/// Operations that are not allowed in the current state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    /// Another attempt is still loading.
    #[error("a generation attempt is already in progress")]
    AttemptInFlight,
    /// The current error cannot be fixed by resubmitting.
    #[error("the last error is not retryable")]
    NotRetryable,
    /// There is no failed attempt to retry.
    #[error("there is no failed attempt to retry")]
    NoFailedAttempt,
}

#[derive(Default)]
struct Session {
    state: GenerationState,
    next_attempt: u64,
    inputs: Option<Arc<GenerationInputs>>,
    cancel: Option<CancellationToken>,
}

struct Shared {
    gateway: GenerationGateway,
    normalizer: ResultNormalizer,
    schedule: StageSchedule,
    session: Mutex<Session>,
    updates: watch::Sender<GenerationState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &Session) {
        self.updates.send_replace(session.state.clone());
    }

    fn advance(&self, attempt: u64, stage: LoadingStage) {
        let mut session = self.lock();
        match &mut session.state {
            GenerationState::Loading(status) if status.attempt == attempt && stage > status.stage => {
                status.stage = stage;
                debug!(attempt, %stage, "loading stage advanced");
            }
            _ => return,
        }
        self.publish(&session);
    }

    fn complete(&self, attempt: u64, request: &GenerationRequest, outcome: GatewayOutcome) {
        let mut session = self.lock();
        if !matches!(&session.state, GenerationState::Loading(s) if s.attempt == attempt) {
            debug!(attempt, "discarding outcome of abandoned attempt");
            return;
        }
        if let Some(token) = session.cancel.take() {
            token.cancel();
        }

        session.state = match outcome.result {
            Ok(raw) => {
                let result = self.normalizer.normalize(raw, request, outcome.elapsed);
                info!(attempt, processing_time_ms = result.processing_time_ms, "generation succeeded");
                GenerationState::Success(result)
            }
            Err(raw) => {
                let error = classify(std::slice::from_ref(&raw));
                warn!(attempt, code = %error.code, status = error.status, "generation failed");
                GenerationState::Error(error)
            }
        };
        self.publish(&session);
    }
}

/// Drives generation attempts for a single session.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    /// Create an idle session using the default stage schedule.
    #[must_use]
    pub fn new(gateway: GenerationGateway, normalizer: ResultNormalizer) -> Self {
        Self::with_schedule(gateway, normalizer, StageSchedule::default())
    }

    /// Create an idle session with a custom stage schedule.
    #[must_use]
    pub fn with_schedule(
        gateway: GenerationGateway,
        normalizer: ResultNormalizer,
        schedule: StageSchedule,
    ) -> Self {
        let (updates, _) = watch::channel(GenerationState::Idle);
        Self {
            shared: Arc::new(Shared {
                gateway,
                normalizer,
                schedule,
                session: Mutex::new(Session::default()),
                updates,
            }),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> GenerationState {
        self.shared.lock().state.clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.shared.updates.subscribe()
    }

    /// Whether a new attempt could start with `inputs`.
    #[must_use]
    pub fn can_generate(&self, inputs: &GenerationInputs) -> bool {
        inputs.person.is_some() && inputs.clothing.is_some() && !self.state().is_loading()
    }

    /// Start an attempt.
    ///
    /// Clears any previous result or error. Rejected inputs or missing
    /// credentials lead straight to the error state without contacting the
    /// gateway. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::AttemptInFlight`] while loading.
    pub fn start(&self, inputs: GenerationInputs) -> Result<GenerationState, OrchestratorError> {
        let mut session = self.shared.lock();
        if session.state.is_loading() {
            return Err(OrchestratorError::AttemptInFlight);
        }
        let inputs = Arc::new(inputs);
        session.inputs = Some(Arc::clone(&inputs));
        Ok(self.begin(&mut session, &inputs))
    }

    /// Re-run the last attempt with the same inputs.
    ///
    /// # Errors
    ///
    /// Fails unless the session is in the error state with a retryable error.
    pub fn retry(&self) -> Result<GenerationState, OrchestratorError> {
        let mut session = self.shared.lock();
        match &session.state {
            GenerationState::Error(error) if error.is_retryable => {}
            GenerationState::Error(_) => return Err(OrchestratorError::NotRetryable),
            _ => return Err(OrchestratorError::NoFailedAttempt),
        }
        let inputs = session.inputs.clone().ok_or(OrchestratorError::NoFailedAttempt)?;
        info!("retrying generation");
        Ok(self.begin(&mut session, &inputs))
    }

    /// Abandon the attempt in flight and return to idle.
    ///
    /// Stage updates stop immediately and a late gateway answer is ignored.
    /// Outside the loading state this does nothing.
    pub fn cancel(&self) -> GenerationState {
        let mut session = self.shared.lock();
        if let GenerationState::Loading(status) = &session.state {
            let attempt = status.attempt;
            if let Some(token) = session.cancel.take() {
                token.cancel();
            }
            session.state = GenerationState::Idle;
            info!(attempt, "generation cancelled");
            self.shared.publish(&session);
        }
        session.state.clone()
    }

    /// Clear an error and return to idle. Outside the error state this does
    /// nothing.
    pub fn dismiss(&self) -> GenerationState {
        let mut session = self.shared.lock();
        if matches!(session.state, GenerationState::Error(_)) {
            session.state = GenerationState::Idle;
            self.shared.publish(&session);
        }
        session.state.clone()
    }

    /// Discard the result and return to idle, keeping the caller's inputs.
    /// Outside the success state this does nothing.
    pub fn generate_another(&self) -> GenerationState {
        let mut session = self.shared.lock();
        if matches!(session.state, GenerationState::Success(_)) {
            session.state = GenerationState::Idle;
            self.shared.publish(&session);
        }
        session.state.clone()
    }

    /// Wait until no attempt is loading and return that state.
    pub async fn settled(&self) -> GenerationState {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|s| !s.is_loading()).await.map(|s| (*s).clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Export the current result into `dir`.
    ///
    /// The session state is never changed, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns a `DOWNLOAD_ERROR` state when there is no result with an image
    /// or when fetching, converting or writing fails.
    pub async fn download(&self, options: &DownloadOptions, dir: &Path) -> Result<PathBuf, ErrorState> {
        let state = self.state();
        let Some(result) = state.result() else {
            return Err(ErrorState::download("There is no generated result to download."));
        };
        export_result(result, options, dir).await.map_err(|e| {
            warn!(error = %e, "download failed");
            ErrorState::download(e.to_string())
        })
    }

    fn begin(&self, session: &mut Session, inputs: &GenerationInputs) -> GenerationState {
        if let Some(token) = session.cancel.take() {
            token.cancel();
        }
        match self.preflight(inputs) {
            Err(error) => {
                info!(code = %error.code, "generation rejected before dispatch");
                session.state = GenerationState::Error(error);
            }
            Ok(request) => {
                let attempt = session.next_attempt;
                session.next_attempt += 1;
                let started_at = Instant::now();
                let token = CancellationToken::new();
                session.state = GenerationState::Loading(LoadingStatus {
                    attempt,
                    stage: LoadingStage::Preparing,
                    started_at,
                });
                session.cancel = Some(token.clone());
                info!(attempt, "generation started");

                tokio::spawn(run_schedule(Arc::clone(&self.shared), attempt, started_at, token.clone()));
                tokio::spawn(run_attempt(Arc::clone(&self.shared), attempt, request, token));
            }
        }
        self.shared.publish(session);
        session.state.clone()
    }

    fn preflight(&self, inputs: &GenerationInputs) -> Result<GenerationRequest, ErrorState> {
        let mut signals = Vec::new();
        if let Err(e) = self.shared.gateway.credentials() {
            signals.push(e);
        }
        signals.extend(validation_signal(inputs.person.as_ref()));
        signals.extend(validation_signal(inputs.clothing.as_ref()));

        match (&inputs.person, &inputs.clothing) {
            (Some(person), Some(clothing)) if signals.is_empty() => {
                Ok(build_request(person, clothing, inputs.body_data.as_ref()))
            }
            _ => Err(classify(&signals)),
        }
    }
}

fn validation_signal(image: Option<&UploadedImage>) -> Option<RawError> {
    let err = validate_image(image).err()?;
    Some(match (err, image) {
        (FileValidationError::FileTooLarge, Some(image)) => {
            RawError::ImageTooLarge { name: image.name().to_string(), size: image.size() }
        }
        (FileValidationError::InvalidFileType | FileValidationError::UploadFailed, Some(image)) => {
            RawError::InvalidFileType { name: image.name().to_string() }
        }
        _ => RawError::MissingImages,
    })
}

async fn run_schedule(shared: Arc<Shared>, attempt: u64, started_at: Instant, cancel: CancellationToken) {
    for &(stage, offset) in shared.schedule.steps().iter().skip(1) {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep_until(started_at + offset) => shared.advance(attempt, stage),
        }
    }
}

async fn run_attempt(
    shared: Arc<Shared>,
    attempt: u64,
    request: GenerationRequest,
    cancel: CancellationToken,
) {
    let outcome = shared.gateway.send(&request, &cancel).await;
    shared.complete(attempt, &request, outcome);
}
