//! What the output region shows and how it gets there.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};

use crate::error::UploadError;

pub const IN_PROGRESS_MESSAGE: &str = "⏳ Analyzing CV...";
pub const RESULT_HEADING: &str = "Result";

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNotice {
    pub title: String,
    pub message: String,
}

impl From<&UploadError> for ErrorNotice {
    fn from(err: &UploadError) -> Self {
        Self {
            title: err.title().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionContent {
    InProgress,
    Result(Map<String, Value>),
    ReportSaved(PathBuf),
    Error(ErrorNotice),
}

impl RegionContent {
    pub fn error(err: &UploadError) -> Self {
        RegionContent::Error(ErrorNotice::from(err))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RegionContent::Error(_))
    }

    pub fn to_html(&self) -> String {
        match self {
            RegionContent::InProgress => IN_PROGRESS_MESSAGE.to_string(),
            RegionContent::Result(body) => format!(
                "<h3>{}</h3><pre>{}</pre>",
                RESULT_HEADING,
                escape_html(&pretty(body))
            ),
            RegionContent::ReportSaved(path) => format!(
                "<h3>{}</h3><p>Report saved to <code>{}</code></p>",
                RESULT_HEADING,
                escape_html(&path.display().to_string())
            ),
            RegionContent::Error(notice) => format!(
                "<h3>{}</h3><p class=\"error\">{}</p>",
                escape_html(&notice.title),
                escape_html(&notice.message)
            ),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            RegionContent::InProgress => IN_PROGRESS_MESSAGE.to_string(),
            RegionContent::Result(body) => format!("{}\n{}", RESULT_HEADING, pretty(body)),
            RegionContent::ReportSaved(path) => {
                format!("{}\nReport saved to {}", RESULT_HEADING, path.display())
            }
            RegionContent::Error(notice) => format!("⚠ {}: {}", notice.title, notice.message),
        }
    }
}

fn pretty(body: &Map<String, Value>) -> String {
    // A Map<String, Value> always serializes.
    serde_json::to_string_pretty(body).unwrap_or_default()
}

/// Quotes are left alone; the text only ever lands in element content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// The page element that shows status and results.
pub trait OutputRegion: Send + Sync + 'static {
    fn show(&self, content: &RegionContent);
}

/// Keeps every write; used by tests and embedders that render elsewhere.
#[derive(Debug, Default)]
pub struct MemoryRegion {
    writes: Mutex<Vec<RegionContent>>,
}

impl MemoryRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<RegionContent> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn html(&self) -> String {
        self.current().map(|c| c.to_html()).unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<RegionContent> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OutputRegion for MemoryRegion {
    fn show(&self, content: &RegionContent) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(content.clone());
    }
}

/// Writes each state to stdout, errors to stderr.
#[derive(Debug, Default)]
pub struct TerminalRegion {
    pub html: bool,
}

impl TerminalRegion {
    pub fn new(html: bool) -> Self {
        Self { html }
    }
}

impl OutputRegion for TerminalRegion {
    fn show(&self, content: &RegionContent) {
        let text = if self.html {
            content.to_html()
        } else {
            content.to_text()
        };
        let _ = if content.is_error() {
            writeln!(std::io::stderr(), "{}", text)
        } else {
            writeln!(std::io::stdout(), "{}", text)
        };
    }
}
