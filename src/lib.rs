pub mod controller;
pub mod error;
pub mod events;
pub mod form;
pub mod render;
pub mod reports;
pub mod settings;
pub mod upload;

use std::path::PathBuf;

pub use controller::{ControllerOptions, Outcome, Submission, UploadFormController};
pub use error::{UploadError, UploadResult};
pub use events::SubmitEvent;
pub use form::{DocumentFile, FileInput, SubmissionRequest, TextInput, UploadForm};
pub use render::{MemoryRegion, OutputRegion, RegionContent, TerminalRegion};
pub use settings::{load_settings, save_settings, AppSettings, ConcurrencyPolicy, FieldNames};
pub use upload::{AnalysisResponse, HttpTransport, Transport};

/// Form values for one headless run.
#[derive(Debug, Clone)]
pub struct HeadlessSubmit {
    pub name: String,
    pub chapter: String,
    pub role: String,
    pub document: Option<PathBuf>,
    /// Already merged with `EVALHV_ENDPOINT` by the caller.
    pub endpoint: Option<String>,
    pub html: bool,
}

/// Submit once without a page, printing the output region to the terminal.
pub async fn submit_headless(args: HeadlessSubmit) -> Result<(), String> {
    let settings = load_settings();
    let endpoint = settings
        .resolve_endpoint(args.endpoint.as_deref())
        .map_err(|e| e.to_string())?;

    let transport = HttpTransport::new(endpoint, settings.field_names.clone(), settings.timeout())
        .map_err(|e| e.to_string())?;
    log::info!("analysis endpoint: {}", transport.endpoint());

    let form = UploadForm::new();
    form.name.set(args.name);
    form.chapter.set(args.chapter);
    form.role.set(args.role);
    if let Some(path) = args.document {
        form.document.select_path(path);
    }

    let controller = UploadFormController::new(
        form,
        transport,
        TerminalRegion::new(args.html),
        ControllerOptions::from_settings(&settings),
    );

    let mut event = SubmitEvent::new();
    match controller.handle_submit(&mut event).outcome().await {
        Outcome::Completed(_) => Ok(()),
        Outcome::Failed(err) => Err(err.to_string()),
        Outcome::Superseded | Outcome::Blocked => Err("submission did not complete".to_string()),
    }
}
