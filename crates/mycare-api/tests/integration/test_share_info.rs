//! Integration tests for the share descriptor endpoint
//!
//! Verifies parsing of `GET /s/{code}`, envelope error handling, and the
//! link-status gating built on top of it.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use mycare_core::domain::{
    format::{format_file_size, format_timestamp_ddmmyyyy},
    LinkAvailability, RejectionKind, ShareError, UnavailableReason,
};
use mycare_core::ports::{IShareLinkApi, RemoteError};

use crate::common::{self, RecordingOpener, CODE};

#[tokio::test]
async fn test_get_share_parses_descriptor() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_share(&server, common::descriptor(json!({}))).await;

    let info = client
        .get_share(&common::share_code())
        .await
        .expect("get_share failed");

    assert_eq!(info.code.as_str(), CODE);
    assert_eq!(info.exams.len(), 1);
    assert_eq!(info.exams[0].exam_date.as_deref(), Some("2024-03-15"));
    assert_eq!(info.exams[0].tags, vec!["sangue".to_string()]);
    let file = &info.exams[0].files[0];
    assert_eq!(file.file_name, "blood.pdf");
    assert_eq!(format_file_size(file.file_size), "1.00 KB");
    assert_eq!(info.max_uses, Some(5));
    assert_eq!(info.times_used, 1);
    assert_eq!(info.remaining_uses(), Some(4));
    assert!(info.expires_at.is_some());
    assert_eq!(info.availability(), LinkAvailability::Available);
}

#[tokio::test]
async fn test_get_share_fills_in_missing_code() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_share(&server, json!({ "exams": [] })).await;

    let info = client.get_share(&common::share_code()).await.unwrap();
    assert_eq!(info.code.as_str(), CODE);
    assert!(!info.has_files());
}

#[tokio::test]
async fn test_get_share_not_found_carries_server_message() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": "Share link not found"
        })))
        .mount(&server)
        .await;

    let err = client.get_share(&common::share_code()).await.unwrap_err();
    let remote = err.downcast_ref::<RemoteError>().expect("RemoteError source");
    assert_eq!(
        remote,
        &RemoteError::Rejected {
            status: 404,
            code: None,
            message: "Share link not found".into(),
        }
    );
}

#[tokio::test]
async fn test_success_false_with_200_is_rejected() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Compartilhamento removido",
            "code": "SHARE_REVOKED"
        })))
        .mount(&server)
        .await;

    let err = client.get_share(&common::share_code()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::Rejected { status: 200, code: Some(c), .. }) if c == "SHARE_REVOKED"
    ));
}

#[tokio::test]
async fn test_non_json_body_is_transport_failure() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}")))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = client.get_share(&common::share_code()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::Transport(_))
    ));
}

#[tokio::test]
async fn test_error_without_text_uses_status_message() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let err = client.get_share(&common::share_code()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::Rejected { message, .. }) if message == "API Error: 500"
    ));
}

#[tokio::test]
async fn test_expired_share_shows_unavailable_view() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_share(&server, common::descriptor(json!({ "isExpired": true }))).await;
    let opener = std::sync::Arc::new(RecordingOpener::default());
    let mut flow = common::flow(client, opener);

    let availability = flow.load_share_info().await.unwrap();
    assert_eq!(
        availability,
        LinkAvailability::Unavailable(UnavailableReason::Expired)
    );
    assert_eq!(UnavailableReason::TITLE, "Compartilhamento Indisponível");
    assert_eq!(
        UnavailableReason::Expired.message(),
        "Este compartilhamento expirou."
    );

    // No request-access mock is mounted: a call would fail as 404, not Unavailable
    let err = flow.request_access(common::EMAIL).await.unwrap_err();
    assert_eq!(err, ShareError::Unavailable(UnavailableReason::Expired));
    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn test_load_share_info_twice_gives_same_decision() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_share(&server, common::descriptor(json!({ "isRevoked": true }))).await;
    let mut flow = common::flow(client, std::sync::Arc::new(RecordingOpener::default()));

    let first = flow.load_share_info().await.unwrap();
    let second = flow.load_share_info().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, LinkAvailability::Unavailable(UnavailableReason::Revoked));
}

#[tokio::test]
async fn test_unknown_share_classified_as_not_found() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "message": "Share not found"
        })))
        .mount(&server)
        .await;
    let mut flow = common::flow(client, std::sync::Arc::new(RecordingOpener::default()));

    let err = flow.load_share_info().await.unwrap_err();
    assert!(flow.share_info().is_none());
    assert!(matches!(
        err,
        ShareError::Rejected {
            kind: RejectionKind::NotFound,
            ..
        }
    ));
    assert_eq!(
        err.user_message(),
        "Link de compartilhamento inválido ou expirado."
    );
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let (server, client) = common::setup_share_mock().await;
    drop(server);
    let mut flow = common::flow(client, std::sync::Arc::new(RecordingOpener::default()));

    let err = flow.load_share_info().await.unwrap_err();
    assert!(matches!(err, ShareError::Network(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_expiry_without_offset_is_accepted() {
    for expires_at in ["2030-01-31T12:00:00", "2030-01-31", "2030-01-31 12:00:00"] {
        let (server, client) = common::setup_share_mock().await;
        common::mount_share(&server, common::descriptor(json!({ "expiresAt": expires_at }))).await;

        let info = client
            .get_share(&common::share_code())
            .await
            .unwrap_or_else(|e| panic!("{expires_at} rejected: {e:#}"));
        let parsed = info.expires_at.expect("expiry parsed");
        assert_eq!(format_timestamp_ddmmyyyy(&parsed), "31/01/2030");
    }
}

#[tokio::test]
async fn test_unparsable_expiry_does_not_block_gating() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_share(
        &server,
        common::descriptor(json!({ "expiresAt": "em breve", "isRevoked": true })),
    )
    .await;
    let mut flow = common::flow(client, std::sync::Arc::new(RecordingOpener::default()));

    let availability = flow.load_share_info().await.unwrap();
    assert_eq!(
        availability,
        LinkAvailability::Unavailable(UnavailableReason::Revoked)
    );
    assert!(flow.share_info().unwrap().expires_at.is_none());
}

#[tokio::test]
async fn test_expired_rejection_blocks_later_requests() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}")))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({
            "success": false,
            "code": "SHARE_EXPIRED",
            "error": "Share link expired"
        })))
        .mount(&server)
        .await;
    let mut flow = common::flow(client, std::sync::Arc::new(RecordingOpener::default()));

    let err = flow.load_share_info().await.unwrap_err();
    assert_eq!(err, ShareError::Unavailable(UnavailableReason::Expired));
    assert_eq!(
        flow.availability(),
        LinkAvailability::Unavailable(UnavailableReason::Expired)
    );

    let err = flow.request_access(common::EMAIL).await.unwrap_err();
    assert_eq!(err, ShareError::Unavailable(UnavailableReason::Expired));
    assert_eq!(flow.step().kind(), mycare_core::domain::StepKind::Email);
    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 1);
}
