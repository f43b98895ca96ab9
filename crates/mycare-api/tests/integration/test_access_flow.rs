//! End-to-end tests of the share-access wizard against a mock server
//!
//! Drives ShareAccessFlow through ShareLinkClient: email, OTP, then the
//! token-gated file list.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use mycare_core::domain::{
    format::{format_file_size, NO_FILES_LABEL},
    RejectionKind, ShareError, Step, StepKind,
};

use crate::common::{self, RecordingOpener, CODE, EMAIL, OTP, TOKEN};

#[tokio::test]
async fn test_full_wizard_lists_files() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_share(&server, common::descriptor(json!({}))).await;
    common::mount_otp_exchange(&server).await;
    let mut flow = common::flow(client, Arc::new(RecordingOpener::default()));

    assert!(flow.load_share_info().await.unwrap().is_available());
    assert_eq!(flow.step(), &Step::Email);

    flow.request_access(EMAIL).await.expect("request_access failed");
    assert_eq!(flow.step().kind(), StepKind::Otp);
    assert_eq!(flow.step().email().map(|e| e.as_str()), Some(EMAIL));

    flow.validate_otp(OTP).await.expect("validate_otp failed");
    assert_eq!(flow.step().kind(), StepKind::Files);
    assert_eq!(flow.session().access_token().unwrap().expose(), TOKEN);

    let info = flow.share_info().expect("descriptor loaded");
    let (exam, file) = info.files().next().expect("one file");
    assert_eq!(exam.id, "e1");
    assert_eq!(file.file_name, "blood.pdf");
    assert_eq!(format_file_size(file.file_size), "1.00 KB");
    assert!(file.is_pdf());
}

#[tokio::test]
async fn test_email_is_trimmed_before_sending() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_otp_exchange(&server).await;
    let mut flow = common::flow(client, Arc::new(RecordingOpener::default()));

    flow.request_access("  user@test.com \n").await.unwrap();
    flow.validate_otp(" 482913 ").await.unwrap();
    assert_eq!(flow.step().kind(), StepKind::Files);
}

#[tokio::test]
async fn test_refresh_files_sends_bearer_token() {
    let (server, client) = common::setup_share_mock().await;
    common::mount_share(&server, common::descriptor(json!({}))).await;
    common::mount_otp_exchange(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}/files")))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "exams": [
                    { "id": "e1", "name": "Hemograma completo", "files": [] },
                    { "id": "e2", "name": "Raio-X", "files": [] }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut flow = common::flow(client, Arc::new(RecordingOpener::default()));

    flow.load_share_info().await.unwrap();
    flow.request_access(EMAIL).await.unwrap();
    flow.validate_otp(OTP).await.unwrap();
    let exams = flow.refresh_files().await.expect("refresh_files failed");

    assert_eq!(exams.len(), 2);
    assert!(exams.iter().all(|e| e.files.is_empty()));
    assert_eq!(NO_FILES_LABEL, "PDF não disponível");
    assert_eq!(flow.share_info().unwrap().exams.len(), 2);
    assert!(!flow.share_info().unwrap().has_files());
}

#[tokio::test]
async fn test_email_mismatch_by_message() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("POST"))
        .and(path(format!("/s/{CODE}/request-access")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "error": "Email does not match the share recipient"
        })))
        .mount(&server)
        .await;
    let mut flow = common::flow(client, Arc::new(RecordingOpener::default()));

    let err = flow.request_access("other@test.com").await.unwrap_err();
    assert!(matches!(
        err,
        ShareError::Rejected {
            kind: RejectionKind::EmailMismatch,
            ..
        }
    ));
    assert_eq!(
        err.user_message(),
        "O e-mail informado não corresponde ao e-mail do compartilhamento."
    );
    assert_eq!(flow.step(), &Step::Email);
}

#[tokio::test]
async fn test_wrong_otp_by_structured_code() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("POST"))
        .and(path(format!("/s/{CODE}/request-access")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/s/{CODE}/validate-otp")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Não autorizado",
            "code": "OTP_EXPIRED"
        })))
        .mount(&server)
        .await;
    let mut flow = common::flow(client, Arc::new(RecordingOpener::default()));

    flow.request_access(EMAIL).await.unwrap();
    let err = flow.validate_otp("000000").await.unwrap_err();
    assert!(matches!(
        err,
        ShareError::Rejected {
            kind: RejectionKind::InvalidOtp,
            ..
        }
    ));
    assert_eq!(
        err.user_message(),
        "Código OTP inválido ou expirado. Solicite um novo código."
    );
    assert_eq!(flow.step().kind(), StepKind::Otp);
    assert!(flow.session().access_token().is_none());
}

#[tokio::test]
async fn test_success_without_token_stays_on_otp() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("POST"))
        .and(path(format!("/s/{CODE}/request-access")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/s/{CODE}/validate-otp")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {}
        })))
        .mount(&server)
        .await;
    let mut flow = common::flow(client, Arc::new(RecordingOpener::default()));

    flow.request_access(EMAIL).await.unwrap();
    let err = flow.validate_otp(OTP).await.unwrap_err();
    assert!(matches!(
        err,
        ShareError::Rejected {
            kind: RejectionKind::InvalidOtp,
            ..
        }
    ));
    assert_eq!(flow.step().kind(), StepKind::Otp);
}

#[tokio::test]
async fn test_resend_requests_a_new_code() {
    let (server, client) = common::setup_share_mock().await;
    Mock::given(method("POST"))
        .and(path(format!("/s/{CODE}/request-access")))
        .and(body_json(json!({ "email": EMAIL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(2)
        .mount(&server)
        .await;
    let mut flow = common::flow(client, Arc::new(RecordingOpener::default()));

    flow.request_access(EMAIL).await.unwrap();
    flow.resend_code().unwrap();
    assert_eq!(flow.step(), &Step::Email);
    flow.request_access(EMAIL).await.unwrap();
    assert_eq!(flow.step().kind(), StepKind::Otp);
}

#[tokio::test]
async fn test_invalid_input_sends_nothing() {
    let (server, client) = common::setup_share_mock().await;
    let mut flow = common::flow(client, Arc::new(RecordingOpener::default()));

    assert!(matches!(
        flow.request_access("user.test.com").await,
        Err(ShareError::Validation(_))
    ));
    assert!(matches!(
        flow.request_access("user@test").await,
        Err(ShareError::Validation(_))
    ));

    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}
