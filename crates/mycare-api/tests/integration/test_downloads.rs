//! Integration tests for token-gated downloads
//!
//! Verifies that downloads carry the issued bearer token and that a failed
//! authenticated fetch falls back to opening the raw URL.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use mycare_core::domain::{MediaId, ShareError};
use mycare_core::ports::IShareLinkApi;
use mycare_core::usecases::{DownloadOutcome, ShareAccessFlow};

use crate::common::{self, RecordingOpener, CODE, EMAIL, OTP};

async fn flow_at_files(
    server: &wiremock::MockServer,
    client: mycare_api::share::ShareLinkClient,
    opener: Arc<RecordingOpener>,
) -> ShareAccessFlow {
    common::mount_share(server, common::descriptor(json!({}))).await;
    common::mount_otp_exchange(server).await;
    let mut flow = common::flow(client, opener);
    flow.load_share_info().await.unwrap();
    flow.request_access(EMAIL).await.unwrap();
    flow.validate_otp(OTP).await.unwrap();
    flow
}

#[tokio::test]
async fn test_download_file_carries_bearer_token() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_download(
        &server,
        &format!("/s/{CODE}/files/f1/download"),
        b"%PDF-1.4 test",
        "blood.pdf",
    )
    .await;
    let opener = Arc::new(RecordingOpener::default());
    let mut flow = flow_at_files(&server, client, opener.clone()).await;

    let outcome = flow.download_file("f1").await.expect("download failed");
    let DownloadOutcome::Fetched(file) = outcome else {
        panic!("expected fetched payload, got {outcome:?}");
    };
    assert_eq!(file.bytes, b"%PDF-1.4 test");
    assert_eq!(file.file_name.as_deref(), Some("blood.pdf"));
    assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
    assert!(opener.opened().is_empty());
}

#[tokio::test]
async fn test_download_all_returns_archive() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_download(
        &server,
        &format!("/s/{CODE}/download-all"),
        b"PK\x03\x04",
        "exames.zip",
    )
    .await;
    let mut flow = flow_at_files(&server, client, Arc::new(RecordingOpener::default())).await;

    match flow.download_all().await.unwrap() {
        DownloadOutcome::Fetched(file) => {
            assert_eq!(file.bytes, b"PK\x03\x04");
            assert_eq!(file.file_name.as_deref(), Some("exames.zip"));
        }
        other => panic!("expected fetched archive, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_fetch_opens_raw_url() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}/files/f1/download")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "Token expired"
        })))
        .mount(&server)
        .await;
    let opener = Arc::new(RecordingOpener::default());
    let mut flow = flow_at_files(&server, client, opener.clone()).await;

    let outcome = flow.download_file("f1").await.unwrap();
    let expected = format!("{}/s/{CODE}/files/f1/download", server.uri());
    assert_eq!(outcome, DownloadOutcome::Opened { url: expected.clone() });
    assert_eq!(opener.opened(), vec![expected]);
}

#[tokio::test]
async fn test_failed_fetch_without_fallback_reports_failure() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}/download-all")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let opener = Arc::new(RecordingOpener::default());
    let mut flow = flow_at_files(&server, client, opener.clone())
        .await
        .with_open_fallback(false);

    let err = flow.download_all().await.unwrap_err();
    assert!(matches!(err, ShareError::DownloadFailed(_)));
    assert!(opener.opened().is_empty());
}

#[tokio::test]
async fn test_client_download_rejects_wrong_token() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_download(
        &server,
        &format!("/s/{CODE}/files/f1/download"),
        b"secret",
        "blood.pdf",
    )
    .await;

    let wrong = mycare_core::domain::AccessToken::new("tok-other".to_string()).unwrap();
    let media = MediaId::new("f1".to_string()).unwrap();
    let result = client
        .download_file(&common::share_code(), &media, &wrong)
        .await;
    assert!(result.is_err());

    // Only the bearer-matched mock serves the file
    let unmatched = server.received_requests().await.unwrap_or_default();
    assert_eq!(unmatched.len(), 1);
    assert!(unmatched[0]
        .headers
        .get("authorization")
        .is_some_and(|v| v == "Bearer tok-other"));
}
