use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{UploadError, UploadResult};

pub const ENDPOINT_ENV: &str = "EVALHV_ENDPOINT";

/// Wire names of the four multipart parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub name: String,
    pub chapter: String,
    pub role: String,
    pub document: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            chapter: "chapter".to_string(),
            role: "role".to_string(),
            document: "document".to_string(),
        }
    }
}

/// What happens when the form is submitted again while a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyPolicy {
    /// Abort the in-flight request; the newest submission owns the output region.
    #[default]
    CancelStale,
    /// Ignore submissions until the in-flight request settles.
    RejectWhileInFlight,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub endpoint: Option<String>,
    pub report_dir: Option<String>,
    pub require_document: bool,
    pub timeout_secs: Option<u64>,
    pub concurrency: ConcurrencyPolicy,
    pub field_names: FieldNames,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            report_dir: None,
            require_document: true,
            timeout_secs: None,
            concurrency: ConcurrencyPolicy::default(),
            field_names: FieldNames::default(),
        }
    }
}

impl AppSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Directory where returned PDF reports are written.
    pub fn report_dir(&self) -> PathBuf {
        match &self.report_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::download_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// An explicit endpoint (the `--endpoint` flag or its environment
    /// variable) wins over the one stored in the settings file.
    pub fn resolve_endpoint(&self, explicit: Option<&str>) -> UploadResult<reqwest::Url> {
        let raw = explicit
            .or(self.endpoint.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                UploadError::Config(format!(
                    "no endpoint configured (use --endpoint, {} or `evalhv config set-endpoint`)",
                    ENDPOINT_ENV
                ))
            })?;

        let url = reqwest::Url::parse(raw)
            .map_err(|e| UploadError::Config(format!("invalid endpoint {}: {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(UploadError::Config(format!(
                "unsupported endpoint scheme: {}",
                other
            ))),
        }
    }
}

pub fn get_settings_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("evalhv").join("settings.json")
}

pub fn load_settings() -> AppSettings {
    load_settings_from(&get_settings_path())
}

/// Missing or unparsable files fall back to defaults.
pub fn load_settings_from(path: &Path) -> AppSettings {
    if path.exists() {
        fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    } else {
        AppSettings::default()
    }
}

pub fn save_settings(settings: &AppSettings) -> Result<(), String> {
    save_settings_to(&get_settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
    fs::write(path, json).map_err(|e| e.to_string())?;
    Ok(())
}
