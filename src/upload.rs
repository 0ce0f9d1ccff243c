//! Multipart upload to the analysis endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde_json::{Map, Value};

use crate::error::{UploadError, UploadResult};
use crate::form::SubmissionRequest;
use crate::settings::FieldNames;

/// What the service sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResponse {
    Json(Map<String, Value>),
    Report {
        file_name: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Seam between the controller and the network.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn submit(&self, request: SubmissionRequest) -> UploadResult<AnalysisResponse>;
}

pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    fields: FieldNames,
}

impl HttpTransport {
    pub fn new(endpoint: Url, fields: FieldNames, timeout: Option<Duration>) -> UploadResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| UploadError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            fields,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(&self, request: SubmissionRequest) -> UploadResult<AnalysisResponse> {
        let form = build_form(&self.fields, request)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = header_str(response.headers(), CONTENT_TYPE.as_str());
        let disposition = header_str(response.headers(), CONTENT_DISPOSITION.as_str());
        let body = response.bytes().await?;

        log::debug!(
            "analysis service answered {} ({} bytes, {:?})",
            status,
            body.len(),
            content_type
        );

        interpret_response(
            status,
            content_type.as_deref(),
            disposition.as_deref(),
            &body,
        )
    }
}

fn header_str(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Three text parts plus the document part when one was selected.
pub fn build_form(fields: &FieldNames, request: SubmissionRequest) -> UploadResult<Form> {
    let mut form = Form::new()
        .text(fields.name.clone(), request.name)
        .text(fields.chapter.clone(), request.chapter)
        .text(fields.role.clone(), request.role);

    if let Some(document) = request.document {
        let part = Part::bytes(document.bytes)
            .file_name(document.file_name)
            .mime_str(&document.content_type)
            .map_err(|e| UploadError::Config(format!("invalid content type: {}", e)))?;
        form = form.part(fields.document.clone(), part);
    }

    Ok(form)
}

/// Turn a raw HTTP answer into a response or a typed failure.
pub fn interpret_response(
    status: u16,
    content_type: Option<&str>,
    content_disposition: Option<&str>,
    body: &[u8],
) -> UploadResult<AnalysisResponse> {
    if !(200..300).contains(&status) {
        return Err(UploadError::Status {
            status,
            detail: error_detail(body),
        });
    }

    let is_pdf = content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/pdf"))
        .unwrap_or(false);
    if is_pdf {
        return Ok(AnalysisResponse::Report {
            file_name: content_disposition.and_then(disposition_file_name),
            bytes: body.to_vec(),
        });
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(AnalysisResponse::Json(map)),
        Ok(other) => Err(UploadError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(UploadError::MalformedResponse(e.to_string())),
    }
}

/// The backends answer failures with `{"error": "..."}`.
fn error_detail(body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        if let Some(message) = map.get("error").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "no details".to_string()
    } else {
        text.chars().take(200).collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `attachment; filename="Reporte_Ana.pdf"` -> `Reporte_Ana.pdf`
fn disposition_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("filename") {
                Some(value.trim().trim_matches('"').to_string())
            } else {
                None
            }
        })
        .filter(|name| !name.is_empty())
}
