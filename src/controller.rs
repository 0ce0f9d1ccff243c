//! Upload form controller
//!
//! Owns the submit flow: suppress the default action, snapshot the form,
//! show the in-progress message, send the request on a tokio task, and write
//! the outcome into the output region.
//!
//! Every submission gets a generation number. The region is only written by
//! the submission whose generation is current, and that check happens under
//! the same lock that new submissions take, so stale completions can never
//! overwrite a newer state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::{AbortHandle, JoinHandle};

use crate::error::UploadError;
use crate::events::SubmitEvent;
use crate::form::UploadForm;
use crate::render::{OutputRegion, RegionContent};
use crate::reports::save_report;
use crate::settings::{AppSettings, ConcurrencyPolicy};
use crate::upload::{AnalysisResponse, Transport};

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub require_document: bool,
    pub concurrency: ConcurrencyPolicy,
    pub report_dir: PathBuf,
}

impl ControllerOptions {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            require_document: settings.require_document,
            concurrency: settings.concurrency,
            report_dir: settings.report_dir(),
        }
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

/// How a single submission ended.
#[derive(Debug)]
pub enum Outcome {
    /// The response was rendered.
    Completed(RegionContent),
    /// The error was rendered.
    Failed(UploadError),
    /// A newer submission took over the output region.
    Superseded,
    /// Dropped because another submission was still in flight.
    Blocked,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// Handle to a submission started by [`UploadFormController::handle_submit`].
#[derive(Debug)]
pub struct Submission {
    generation: Option<u64>,
    inner: SubmissionInner,
}

#[derive(Debug)]
enum SubmissionInner {
    Running(JoinHandle<Outcome>),
    Settled(Outcome),
}

impl Submission {
    fn settled(outcome: Outcome) -> Self {
        Self {
            generation: None,
            inner: SubmissionInner::Settled(outcome),
        }
    }

    /// `None` when the submission never reached the network.
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    pub async fn outcome(self) -> Outcome {
        match self.inner {
            SubmissionInner::Settled(outcome) => outcome,
            SubmissionInner::Running(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => Outcome::Superseded,
                Err(e) => Outcome::Failed(UploadError::Interrupted(format!(
                    "submission task failed: {}",
                    e
                ))),
            },
        }
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    generation: u64,
    in_flight: Option<InFlight>,
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

struct Shared<T, O> {
    transport: T,
    output: O,
    options: ControllerOptions,
    state: Mutex<ControllerState>,
}

impl<T, O> Shared<T, O> {
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct UploadFormController<T, O> {
    form: UploadForm,
    shared: Arc<Shared<T, O>>,
}

impl<T, O> Clone for UploadFormController<T, O> {
    fn clone(&self) -> Self {
        Self {
            form: self.form.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport, O: OutputRegion> UploadFormController<T, O> {
    pub fn new(form: UploadForm, transport: T, output: O, options: ControllerOptions) -> Self {
        Self {
            form,
            shared: Arc::new(Shared {
                transport,
                output,
                options,
                state: Mutex::new(ControllerState::default()),
            }),
        }
    }

    pub fn form(&self) -> &UploadForm {
        &self.form
    }

    pub fn output(&self) -> &O {
        &self.shared.output
    }

    pub fn is_in_flight(&self) -> bool {
        self.shared.lock_state().in_flight.is_some()
    }

    /// Submit handler. Must be called from within a tokio runtime.
    pub fn handle_submit(&self, event: &mut SubmitEvent) -> Submission {
        event.prevent_default();

        if let Some(blocked) = self.blocked_by_in_flight(&self.shared.lock_state()) {
            return blocked;
        }

        // Reading the document hits the disk; keep it outside the state lock.
        let read = self.form.read();

        let mut state = self.shared.lock_state();
        if let Some(blocked) = self.blocked_by_in_flight(&state) {
            return blocked;
        }

        let request = match read {
            Ok(request) => request,
            Err(err) => return self.reject(state, err),
        };
        if request.document.is_none() && self.shared.options.require_document {
            return self.reject(state, UploadError::MissingFile);
        }

        let stale = state.in_flight.take();
        state.generation += 1;
        let generation = state.generation;
        self.shared.output.show(&RegionContent::InProgress);

        log::info!(
            "submitting generation {} (document: {})",
            generation,
            request
                .document
                .as_ref()
                .map(|d| d.file_name.as_str())
                .unwrap_or("none")
        );

        let mut guard = CompletionGuard {
            shared: Arc::clone(&self.shared),
            generation,
            settled: false,
        };
        let handle = tokio::spawn(async move {
            let candidate = request.name.clone();
            let result = guard.shared.transport.submit(request).await;
            let outcome = finish(&*guard.shared, generation, &candidate, result);
            guard.settled = true;
            outcome
        });
        state.in_flight = Some(InFlight {
            generation,
            abort: handle.abort_handle(),
        });
        drop(state);

        // The generation is already bumped, so the stale task's guard stays quiet.
        if let Some(stale) = stale {
            log::info!("cancelling stale submission {}", stale.generation);
            stale.abort.abort();
        }

        Submission {
            generation: Some(generation),
            inner: SubmissionInner::Running(handle),
        }
    }

    fn blocked_by_in_flight(&self, state: &ControllerState) -> Option<Submission> {
        let in_flight = state.in_flight.as_ref()?;
        if self.shared.options.concurrency != ConcurrencyPolicy::RejectWhileInFlight {
            return None;
        }
        log::info!(
            "submission ignored, generation {} still in flight",
            in_flight.generation
        );
        Some(Submission::settled(Outcome::Blocked))
    }

    /// Failures before any request is sent. These still win over an in-flight
    /// submission, so a stale response cannot hide the message.
    fn reject(&self, mut state: MutexGuard<'_, ControllerState>, err: UploadError) -> Submission {
        log::warn!("submission rejected: {}", err);
        let stale = state.in_flight.take();
        state.generation += 1;
        self.shared.output.show(&RegionContent::error(&err));
        drop(state);

        if let Some(stale) = stale {
            stale.abort.abort();
        }
        Submission::settled(Outcome::Failed(err))
    }
}

/// Clears the in-flight slot and replaces the in-progress message when a
/// submission task ends without reaching `finish` (a panicking transport).
struct CompletionGuard<T, O: OutputRegion> {
    shared: Arc<Shared<T, O>>,
    generation: u64,
    settled: bool,
}

impl<T, O: OutputRegion> Drop for CompletionGuard<T, O> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.shared.lock_state();
        if state.generation != self.generation {
            return;
        }
        state.in_flight = None;
        let err = UploadError::Interrupted("submission ended without a response".to_string());
        log::error!("submission {} failed: {}", self.generation, err);
        self.shared.output.show(&RegionContent::error(&err));
    }
}

fn is_current<T, O>(shared: &Shared<T, O>, generation: u64) -> bool {
    shared.lock_state().generation == generation
}

fn finish<T, O: OutputRegion>(
    shared: &Shared<T, O>,
    generation: u64,
    candidate: &str,
    result: Result<AnalysisResponse, UploadError>,
) -> Outcome {
    if !is_current(shared, generation) {
        log::info!("discarding result of superseded submission {}", generation);
        return Outcome::Superseded;
    }

    let mut saved = None;
    let content = match result {
        Ok(AnalysisResponse::Json(body)) => Ok(RegionContent::Result(body)),
        Ok(AnalysisResponse::Report { file_name, bytes }) => save_report(
            &shared.options.report_dir,
            file_name.as_deref(),
            candidate,
            &bytes,
        )
        .map(|path| {
            saved = Some(path.clone());
            RegionContent::ReportSaved(path)
        }),
        Err(err) => Err(err),
    };

    let mut state = shared.lock_state();
    if state.generation != generation {
        // Superseded while the report was being written.
        if let Some(path) = saved {
            let _ = std::fs::remove_file(path);
        }
        log::info!("discarding result of superseded submission {}", generation);
        return Outcome::Superseded;
    }
    state.in_flight = None;

    match content {
        Ok(content) => {
            log::info!("submission {} completed", generation);
            shared.output.show(&content);
            Outcome::Completed(content)
        }
        Err(err) => {
            log::error!("submission {} failed: {}", generation, err);
            shared.output.show(&RegionContent::error(&err));
            Outcome::Failed(err)
        }
    }
}
