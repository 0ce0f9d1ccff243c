//! Input handles for the upload form and the request built from them.
//!
//! Handles are cheap to clone and share their value, so the caller keeps one
//! copy to edit while the controller keeps another to read at submit time.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::UploadResult;

/// A single-line text control.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: Arc<Mutex<String>>,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Arc::new(Mutex::new(value.into())),
        }
    }

    pub fn set(&self, value: impl Into<String>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value.into();
    }

    pub fn value(&self) -> String {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A file picked by the user, already loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn read(path: &Path) -> UploadResult<Self> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone)]
enum Selection {
    Path(PathBuf),
    Loaded(DocumentFile),
}

/// A file control holding zero or one selection.
#[derive(Debug, Clone, Default)]
pub struct FileInput {
    selection: Arc<Mutex<Option<Selection>>>,
}

impl FileInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a file on disk; its bytes are read when the form is submitted.
    pub fn select_path(&self, path: impl Into<PathBuf>) {
        self.replace(Some(Selection::Path(path.into())));
    }

    pub fn select_file(&self, file: DocumentFile) {
        self.replace(Some(Selection::Loaded(file)));
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    pub fn read(&self) -> UploadResult<Option<DocumentFile>> {
        let selection = self
            .selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match selection {
            None => Ok(None),
            Some(Selection::Loaded(file)) => Ok(Some(file)),
            Some(Selection::Path(path)) => DocumentFile::read(&path).map(Some),
        }
    }

    fn replace(&self, selection: Option<Selection>) {
        *self.selection.lock().unwrap_or_else(PoisonError::into_inner) = selection;
    }
}

/// The four controls the controller reads on every submission.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub name: TextInput,
    pub chapter: TextInput,
    pub role: TextInput,
    pub document: FileInput,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the controls as they are right now.
    pub fn read(&self) -> UploadResult<SubmissionRequest> {
        Ok(SubmissionRequest {
            name: self.name.value(),
            chapter: self.chapter.value(),
            role: self.role.value(),
            document: self.document.read()?,
        })
    }
}

/// One submission's worth of form data. Built per submit, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub name: String,
    pub chapter: String,
    pub role: String,
    pub document: Option<DocumentFile>,
}
