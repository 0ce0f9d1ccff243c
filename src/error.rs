use thiserror::Error;

/// Everything that can go wrong between the submit event and the output region.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not reach the analysis service: {0}")]
    Network(String),

    #[error("analysis service answered {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("analysis service returned an unreadable response: {0}")]
    MalformedResponse(String),

    #[error("no document selected")]
    MissingFile,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("submission interrupted: {0}")]
    Interrupted(String),
}

impl UploadError {
    /// The request never produced a usable answer from the endpoint.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, UploadError::Network(_) | UploadError::Status { .. })
    }

    /// Heading shown above the message in the output region.
    pub fn title(&self) -> &'static str {
        match self {
            UploadError::Network(_) | UploadError::Status { .. } => "Network error",
            UploadError::MalformedResponse(_) => "Unexpected response",
            UploadError::MissingFile => "Missing document",
            UploadError::Io(_) => "File error",
            UploadError::Config(_) => "Configuration error",
            UploadError::Interrupted(_) => "Submission error",
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Network(err.to_string())
    }
}

pub type UploadResult<T> = Result<T, UploadError>;
