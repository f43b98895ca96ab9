//! Shared test helpers for share-link integration tests
//!
//! Provides wiremock-based mock server setup for the MyCare share-link
//! endpoints. Each helper mounts the necessary mock endpoints; the setup
//! function returns a ShareLinkClient pointing at the mock server.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mycare_api::client::ApiClient;
use mycare_api::share::ShareLinkClient;
use mycare_core::domain::ShareCode;
use mycare_core::ports::IUrlOpener;
use mycare_core::usecases::ShareAccessFlow;

pub const CODE: &str = "ABC123";
pub const EMAIL: &str = "user@test.com";
pub const OTP: &str = "482913";
pub const TOKEN: &str = "tok-xyz";

/// Starts a mock server and returns a (MockServer, ShareLinkClient) tuple.
pub async fn setup_share_mock() -> (MockServer, ShareLinkClient) {
    let server = MockServer::start().await;
    let client = ShareLinkClient::new(ApiClient::new(&server.uri()).expect("valid mock uri"));
    (server, client)
}

pub fn share_code() -> ShareCode {
    ShareCode::new(CODE.to_string()).expect("valid share code")
}

/// Builds a flow over `client` with a recording URL opener.
pub fn flow(client: ShareLinkClient, opener: Arc<RecordingOpener>) -> ShareAccessFlow {
    ShareAccessFlow::new(Arc::new(client), opener, share_code())
}

/// Descriptor with one exam `e1` holding `f1 blood.pdf` (1024 bytes).
pub fn descriptor(flags: Value) -> Value {
    let mut descriptor = json!({
        "code": CODE,
        "exams": [{
            "id": "e1",
            "name": "Hemograma completo",
            "examDate": "2024-03-15",
            "notes": "Jejum de 8h",
            "tags": ["sangue"],
            "hasPdf": true,
            "files": [{
                "id": "f1",
                "mediaType": "pdf",
                "fileName": "blood.pdf",
                "fileSize": 1024,
                "downloadUrl": "/s/ABC123/files/f1/download"
            }]
        }],
        "expiresAt": "2030-01-31T12:00:00Z",
        "maxUses": 5,
        "timesUsed": 1,
        "downloadAllUrl": "/s/ABC123/download-all"
    });
    if let (Some(target), Some(extra)) = (descriptor.as_object_mut(), flags.as_object()) {
        target.extend(extra.clone());
    }
    descriptor
}

/// Mounts `GET /s/ABC123` returning `data` in a success envelope.
pub async fn mount_share(server: &MockServer, data: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/s/{CODE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": data
        })))
        .mount(server)
        .await;
}

/// Mounts request-access and validate-otp for the happy path.
pub async fn mount_otp_exchange(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/s/{CODE}/request-access")))
        .and(body_json(json!({ "email": EMAIL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Código enviado"
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/s/{CODE}/validate-otp")))
        .and(body_json(json!({ "email": EMAIL, "otp": OTP })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "accessToken": TOKEN }
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts a bearer-protected download endpoint at `endpoint`.
pub async fn mount_download(server: &MockServer, endpoint: &str, content: &[u8], file_name: &str) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .append_header("Content-Type", "application/pdf")
                .append_header(
                    "Content-Disposition",
                    format!("attachment; filename=\"{file_name}\"").as_str(),
                ),
        )
        .mount(server)
        .await;
}

/// URL opener that records every URL instead of launching a browser.
#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl IUrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
