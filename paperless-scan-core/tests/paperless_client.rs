use std::fs;
use std::path::Path;
use std::sync::Arc;

use paperless_scan_core::contract::{HttpResponse, MockHttpTransport, UploadAck};
use paperless_scan_core::paperless::PaperlessClient;
use paperless_scan_core::settings::Settings;
use paperless_scan_core::ScanError;
use tempfile::tempdir;
use uuid::Uuid;

const BASE: &str = "http://paperless.test";
const TAGS_URL: &str = "http://paperless.test/api/tags/";
const DOCUMENTS_URL: &str = "http://paperless.test/api/documents/";
const INTAKE_URL: &str = "http://paperless.test/api/documents/post_document/";

fn settings(dir: &Path, tags: &[&str]) -> Arc<Settings> {
    Arc::new(Settings {
        paperless_api_url: format!("{BASE}/"),
        paperless_api_token: "secret".into(),
        scan_output_dir: dir.to_path_buf(),
        default_tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Settings::default()
    })
}

fn tag_list(transport: &mut MockHttpTransport, body: &'static str) {
    transport
        .expect_get()
        .withf(|url, token| url == TAGS_URL && token == "secret")
        .times(1)
        .returning(move |_, _| Ok(HttpResponse::new(200, body)));
}

#[tokio::test]
async fn existing_tag_matches_case_insensitively_without_create() {
    let dir = tempdir().unwrap();
    let mut transport = MockHttpTransport::new();
    tag_list(
        &mut transport,
        r#"{"count": 1, "results": [{"id": 3, "name": "scanned"}]}"#,
    );
    transport.expect_post_json().times(0);

    let client = PaperlessClient::with_transport(settings(dir.path(), &[]), transport);
    let ids = client.resolve_tag_names(&["Scanned"]).await.unwrap();

    assert_eq!(ids, vec![3]);
}

#[tokio::test]
async fn missing_tag_is_created_exactly_once() {
    let dir = tempdir().unwrap();
    let mut transport = MockHttpTransport::new();
    tag_list(&mut transport, r#"{"results": [{"id": 3, "name": "scanned"}]}"#);
    transport
        .expect_post_json()
        .withf(|url, token, body| {
            url == TAGS_URL && token == "secret" && body["name"] == "NewTag"
        })
        .times(1)
        .returning(|_, _, _| Ok(HttpResponse::new(201, r#"{"id": 42, "name": "NewTag"}"#)));

    let client = PaperlessClient::with_transport(settings(dir.path(), &[]), transport);
    let ids = client
        .resolve_tag_names(&["NewTag".to_string(), "newtag".to_string()])
        .await
        .unwrap();

    assert_eq!(ids, vec![42, 42]);
}

#[tokio::test]
async fn tags_that_cannot_be_created_are_dropped() {
    let dir = tempdir().unwrap();
    let mut transport = MockHttpTransport::new();
    tag_list(&mut transport, r#"{"results": []}"#);
    transport
        .expect_post_json()
        .withf(|_, _, body| body["name"] == "rejected")
        .times(1)
        .returning(|_, _, _| Ok(HttpResponse::new(400, r#"{"name": ["invalid"]}"#)));
    transport
        .expect_post_json()
        .withf(|_, _, body| body["name"] == "offline")
        .times(1)
        .returning(|_, _, _| Err("connection reset".into()));
    transport
        .expect_post_json()
        .withf(|_, _, body| body["name"] == "fine")
        .times(1)
        .returning(|_, _, _| Ok(HttpResponse::new(201, r#"{"id": 7}"#)));

    let client = PaperlessClient::with_transport(settings(dir.path(), &[]), transport);
    let ids = client
        .resolve_tag_names(&["rejected", "offline", "fine"])
        .await
        .unwrap();

    assert_eq!(ids, vec![7]);
}

#[tokio::test]
async fn unreachable_tag_list_is_an_error() {
    let dir = tempdir().unwrap();
    let mut transport = MockHttpTransport::new();
    transport
        .expect_get()
        .times(1)
        .returning(|_, _| Ok(HttpResponse::new(403, "forbidden")));

    let client = PaperlessClient::with_transport(settings(dir.path(), &[]), transport);
    let err = client.resolve_tag_names(&["scanned"]).await.unwrap_err();

    assert!(matches!(err, ScanError::RemoteService { status: 403, .. }));
}

#[tokio::test]
async fn upload_with_invalid_settings_does_no_io() {
    let dir = tempdir().unwrap();
    let mut transport = MockHttpTransport::new();
    transport.expect_get().times(0);
    transport.expect_post_json().times(0);
    transport.expect_post_multipart().times(0);
    let invalid = Arc::new(Settings {
        paperless_api_url: "paperless.test".into(),
        paperless_api_token: String::new(),
        scan_output_dir: dir.path().to_path_buf(),
        ..Settings::default()
    });

    let client = PaperlessClient::with_transport(invalid, transport);
    let err = client
        .upload(&dir.path().join("never-read.pdf"))
        .await
        .unwrap_err();

    match &err {
        ScanError::Configuration(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected Configuration, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Configuration error: Paperless API URL must be a valid HTTP/HTTPS URL, Paperless API Token is required"
    );
}

#[tokio::test]
async fn upload_of_missing_file_is_not_found() {
    let dir = tempdir().unwrap();
    let mut transport = MockHttpTransport::new();
    transport.expect_post_multipart().times(0);

    let client = PaperlessClient::with_transport(settings(dir.path(), &["scanned"]), transport);
    let err = client
        .upload(&dir.path().join("combined-x.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::NotFound(_)));
    assert!(err.to_string().starts_with("File not found: "));
}

#[tokio::test]
async fn upload_sends_document_with_resolved_tags() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("combined-1.pdf");
    fs::write(&file, b"%PDF-1.4 body").unwrap();
    let task_id = Uuid::new_v4().to_string();

    let mut transport = MockHttpTransport::new();
    tag_list(
        &mut transport,
        r#"{"results": [{"id": 3, "name": "Scanned"}, {"id": 5, "name": "automated"}]}"#,
    );
    transport.expect_post_json().times(0);
    let body = format!("\"{task_id}\"");
    transport
        .expect_post_multipart()
        .withf(|url, token, document| {
            url == INTAKE_URL
                && token == "secret"
                && document.file_name == "combined-1.pdf"
                && document.content == b"%PDF-1.4 body"
                && document.tag_ids == vec![3, 5]
        })
        .times(1)
        .returning(move |_, _, _| Ok(HttpResponse::new(200, body.clone())));

    let client = PaperlessClient::with_transport(
        settings(dir.path(), &["scanned", "automated"]),
        transport,
    );
    let ack = client.upload(&file).await.expect("upload should succeed");

    assert_eq!(ack, UploadAck::BareTaskId(task_id));
}

#[tokio::test]
async fn upload_continues_untagged_when_tags_are_unavailable() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("combined-2.pdf");
    fs::write(&file, b"%PDF").unwrap();

    let mut transport = MockHttpTransport::new();
    transport
        .expect_get()
        .times(1)
        .returning(|_, _| Err("dns failure".into()));
    transport
        .expect_post_multipart()
        .withf(|_, _, document| document.tag_ids.is_empty())
        .times(1)
        .returning(|_, _, _| Ok(HttpResponse::new(202, r#"{"task_id": "abc-123"}"#)));

    let client = PaperlessClient::with_transport(settings(dir.path(), &["scanned"]), transport);
    let ack = client.upload(&file).await.unwrap();

    assert_eq!(ack, UploadAck::TaskIdField("abc-123".into()));
    assert_eq!(ack.task_id(), Some("abc-123"));
}

#[tokio::test]
async fn upload_without_default_tags_skips_tag_lookup() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("combined-3.pdf");
    fs::write(&file, b"%PDF").unwrap();

    let mut transport = MockHttpTransport::new();
    transport.expect_get().times(0);
    transport
        .expect_post_multipart()
        .times(1)
        .returning(|_, _, _| Ok(HttpResponse::new(200, "{}")));

    let client = PaperlessClient::with_transport(settings(dir.path(), &[]), transport);
    let ack = client.upload(&file).await.unwrap();

    assert_eq!(ack, UploadAck::Unrecognized);
}

#[tokio::test]
async fn rejected_upload_reports_detail_or_raw_body() {
    let cases = [
        (401, r#"{"detail": "Invalid token."}"#, "Paperless API error: HTTP 401: Invalid token."),
        (400, r#"{"error": "Not a PDF"}"#, "Paperless API error: HTTP 400: Not a PDF"),
        (502, "Bad Gateway", "Paperless API error: HTTP 502: Bad Gateway"),
        (500, "", "Paperless API error: HTTP 500"),
    ];

    for (status, body, expected) in cases {
        let dir = tempdir().unwrap();
        let file = dir.path().join("combined.pdf");
        fs::write(&file, b"%PDF").unwrap();

        let mut transport = MockHttpTransport::new();
        transport
            .expect_post_multipart()
            .times(1)
            .returning(move |_, _, _| Ok(HttpResponse::new(status, body)));

        let client = PaperlessClient::with_transport(settings(dir.path(), &[]), transport);
        let err = client.upload(&file).await.unwrap_err();

        assert!(matches!(err, ScanError::RemoteService { .. }));
        assert_eq!(err.to_string(), expected);
    }
}

#[tokio::test]
async fn connection_test_reports_http_errors_without_failing() {
    let dir = tempdir().unwrap();
    let mut transport = MockHttpTransport::new();
    transport
        .expect_get()
        .withf(|url, _| url == DOCUMENTS_URL)
        .times(1)
        .returning(|_, _| Ok(HttpResponse::new(500, "Internal Server Error")));

    let client = PaperlessClient::with_transport(settings(dir.path(), &[]), transport);
    let status = client.test_connection().await;

    assert!(!status.success);
    assert_eq!(status.error.as_deref(), Some("HTTP 500: Internal Server Error"));
}

#[tokio::test]
async fn connection_test_succeeds_even_with_unparseable_body() {
    let dir = tempdir().unwrap();
    let mut transport = MockHttpTransport::new();
    transport
        .expect_get()
        .times(1)
        .returning(|_, _| Ok(HttpResponse::new(200, "not json")));

    let client = PaperlessClient::with_transport(settings(dir.path(), &[]), transport);
    let status = client.test_connection().await;

    assert!(status.success);
    assert!(status.error.is_none());
}

#[tokio::test]
async fn connection_test_rejects_invalid_settings_before_probing() {
    let mut transport = MockHttpTransport::new();
    transport.expect_get().times(0);
    let client = PaperlessClient::with_transport(Arc::new(Settings::default()), transport);

    let status = client.test_connection().await;

    assert!(!status.success);
    assert_eq!(
        status.error.as_deref(),
        Some("Configuration error: Paperless API Token is required")
    );
}

#[tokio::test]
async fn connection_test_reports_transport_errors() {
    let dir = tempdir().unwrap();
    let mut transport = MockHttpTransport::new();
    transport
        .expect_get()
        .times(1)
        .returning(|_, _| Err("connection refused".into()));

    let client = PaperlessClient::with_transport(settings(dir.path(), &[]), transport);
    let status = client.test_connection().await;

    assert!(!status.success);
    assert_eq!(status.error.as_deref(), Some("connection refused"));
}
