use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Multipart;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use evalhv_lib::render::IN_PROGRESS_MESSAGE;
use evalhv_lib::{
    AppSettings, ControllerOptions, DocumentFile, FieldNames, HttpTransport, MemoryRegion, Outcome,
    RegionContent, SubmitEvent, UploadError, UploadForm, UploadFormController,
};

const CV_BYTES: &[u8] = b"%PDF-1.4\n\x00\x01\x02\xff binary tail";

async fn echo(mut multipart: Multipart) -> Json<Value> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap();
        parts.push(json!({
            "name": name,
            "file_name": file_name,
            "content_type": content_type,
            "bytes": bytes.to_vec(),
        }));
    }
    Json(json!({ "parts": parts }))
}

async fn scored() -> Json<Value> {
    Json(json!({"score": 8.5, "matched": true}))
}

async fn not_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html")], "<html>502 upstream</html>")
}

async fn rejected() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "Faltan campos obligatorios."})),
    )
}

async fn report() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"Reporte_Ana.pdf\"",
            ),
        ],
        b"%PDF-1.7 report".to_vec(),
    )
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({"late": true}))
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/echo", post(echo))
        .route("/analyze", post(scored))
        .route("/broken", post(not_json))
        .route("/rejected", post(rejected))
        .route("/report", post(report))
        .route("/slow", post(slow));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn filled_form() -> UploadForm {
    let form = UploadForm::new();
    form.name.set("Ana");
    form.chapter.set("3");
    form.role.set("Coordinator");
    form.document
        .select_file(DocumentFile::new("cv.pdf", CV_BYTES.to_vec()));
    form
}

fn controller(
    url: &str,
    options: ControllerOptions,
) -> UploadFormController<HttpTransport, MemoryRegion> {
    let transport =
        HttpTransport::new(url.parse().unwrap(), FieldNames::default(), None).unwrap();
    UploadFormController::new(filled_form(), transport, MemoryRegion::new(), options)
}

fn rendered_parts(outcome: Outcome) -> Vec<Value> {
    match outcome {
        Outcome::Completed(RegionContent::Result(body)) => {
            body["parts"].as_array().unwrap().clone()
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn sends_four_named_parts() {
    let addr = spawn_server().await;
    let c = controller(&format!("http://{}/echo", addr), ControllerOptions::default());

    let mut event = SubmitEvent::new();
    let parts = rendered_parts(c.handle_submit(&mut event).outcome().await);
    assert!(event.default_prevented());
    assert_eq!(parts.len(), 4);

    let names: Vec<&str> = parts.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["name", "chapter", "role", "document"]);

    let text = |i: usize| -> Vec<u8> { serde_json::from_value(parts[i]["bytes"].clone()).unwrap() };
    assert_eq!(text(0), b"Ana");
    assert_eq!(text(1), b"3");
    assert_eq!(text(2), b"Coordinator");

    let document = &parts[3];
    assert_eq!(document["file_name"], "cv.pdf");
    assert_eq!(document["content_type"], "application/pdf");
    assert_eq!(text(3), CV_BYTES);
}

#[tokio::test]
async fn custom_field_names_are_used() {
    let addr = spawn_server().await;
    let fields = FieldNames {
        name: "candidate_name".into(),
        role: "position".into(),
        document: "pdf".into(),
        ..FieldNames::default()
    };
    let transport = HttpTransport::new(
        format!("http://{}/echo", addr).parse().unwrap(),
        fields,
        None,
    )
    .unwrap();
    let c = UploadFormController::new(
        filled_form(),
        transport,
        MemoryRegion::new(),
        ControllerOptions::default(),
    );

    let parts = rendered_parts(c.handle_submit(&mut SubmitEvent::new()).outcome().await);
    let names: Vec<&str> = parts.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["candidate_name", "chapter", "position", "pdf"]);
}

#[tokio::test]
async fn optional_document_is_omitted() {
    let addr = spawn_server().await;
    let options = ControllerOptions {
        require_document: false,
        ..ControllerOptions::default()
    };
    let c = controller(&format!("http://{}/echo", addr), options);
    c.form().document.clear();

    let parts = rendered_parts(c.handle_submit(&mut SubmitEvent::new()).outcome().await);
    assert_eq!(parts.len(), 3);
}

#[tokio::test]
async fn renders_result_block() {
    let addr = spawn_server().await;
    let c = controller(&format!("http://{}/analyze", addr), ControllerOptions::default());

    let submission = c.handle_submit(&mut SubmitEvent::new());
    assert_eq!(c.output().html(), IN_PROGRESS_MESSAGE);
    assert!(submission.outcome().await.is_completed());

    let html = c.output().html();
    assert!(html.starts_with("<h3>Result</h3><pre>"));
    assert!(html.contains("\"score\": 8.5"));
    assert!(html.contains("\"matched\": true"));
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let c = controller(&format!("http://{}/analyze", addr), ControllerOptions::default());

    let mut event = SubmitEvent::new();
    let outcome = c.handle_submit(&mut event).outcome().await;
    assert!(event.default_prevented());
    assert!(matches!(outcome, Outcome::Failed(UploadError::Network(_))));

    let current = c.output().current().unwrap();
    assert!(current.is_error());
    assert_ne!(c.output().html(), IN_PROGRESS_MESSAGE);
    assert!(!c.output().html().contains("<pre>"));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let addr = spawn_server().await;
    let c = controller(&format!("http://{}/broken", addr), ControllerOptions::default());

    let outcome = c.handle_submit(&mut SubmitEvent::new()).outcome().await;
    assert!(matches!(outcome, Outcome::Failed(UploadError::MalformedResponse(_))));
    assert!(c.output().html().contains("Unexpected response"));
}

#[tokio::test]
async fn service_error_message_is_shown() {
    let addr = spawn_server().await;
    let c = controller(&format!("http://{}/rejected", addr), ControllerOptions::default());

    let outcome = c.handle_submit(&mut SubmitEvent::new()).outcome().await;
    match outcome {
        Outcome::Failed(UploadError::Status { status, detail }) => {
            assert_eq!(status, 400);
            assert_eq!(detail, "Faltan campos obligatorios.");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(c.output().html().contains("Faltan campos obligatorios."));
}

#[tokio::test]
async fn pdf_report_lands_in_report_dir() {
    let addr = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let options = ControllerOptions {
        report_dir: dir.path().to_path_buf(),
        ..ControllerOptions::default()
    };
    let c = controller(&format!("http://{}/report", addr), options);

    let outcome = c.handle_submit(&mut SubmitEvent::new()).outcome().await;
    assert!(outcome.is_completed());

    let saved = dir.path().join("Reporte_Ana.pdf");
    assert_eq!(std::fs::read(&saved).unwrap(), b"%PDF-1.7 report");
    assert!(c.output().html().contains("Reporte_Ana.pdf"));
}

#[tokio::test]
async fn configured_timeout_is_network_error() {
    let addr = spawn_server().await;
    let settings = AppSettings {
        timeout_secs: Some(1),
        ..AppSettings::default()
    };
    let transport = HttpTransport::new(
        format!("http://{}/slow", addr).parse().unwrap(),
        settings.field_names.clone(),
        settings.timeout(),
    )
    .unwrap();
    let c = UploadFormController::new(
        filled_form(),
        transport,
        MemoryRegion::new(),
        ControllerOptions::from_settings(&settings),
    );

    let outcome = c.handle_submit(&mut SubmitEvent::new()).outcome().await;
    assert!(matches!(outcome, Outcome::Failed(UploadError::Network(_))));
    assert!(c.output().current().unwrap().is_error());
    assert!(!c.is_in_flight());
}
