//! Test utilities for integration tests
use std::io::Write;
use std::sync::Arc;

use axum::{Router, body::Body};
use mockito::{Mock, ServerGuard};
use tempfile::NamedTempFile;

use pushcast::api::AppState;
use pushcast::api::app;
use pushcast::core::{AppConfig, Services};

pub const PROJECT_PATH: &str = "/v1/projects/demo/databases/(default)/documents/fcm_tokens";
pub const SEND_PATH: &str = "/v1/projects/demo/messages:send";
pub const BATCH_ADD_PATH: &str = "/iid/v1:batchAdd";

/// A router whose Google endpoints all point at one mock server.
///
/// The token exchange is already mocked. Keep the whole struct alive
/// for the duration of the test, dropping it removes the key file and
/// stops the server.
pub struct TestApp {
    pub app: Router,
    pub server: ServerGuard,
    _token: Mock,
    _key: NamedTempFile,
}

pub async fn test_app() -> TestApp {
    let mut server = mockito::Server::new_async().await;
    let token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token": "test_token", "expires_in": 3600}"#)
        .create_async()
        .await;

    let key = serde_json::json!({
        "type": "service_account",
        "project_id": "demo",
        "private_key_id": "test-key",
        "private_key": include_str!("../fixtures/test_key.pem"),
        "client_email": "pushcast@demo.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", server.url()),
    });
    let mut key_file = NamedTempFile::new().expect("Failed to create key file");
    write!(key_file, "{}", key).expect("Failed to write key file");

    let app_config = AppConfig {
        service_account_path: key_file.path().to_path_buf(),
        fcm_api_url: server.url(),
        firestore_api_url: server.url(),
        iid_api_url: server.url(),
        ..Default::default()
    };
    let services = Services::from_config(&app_config).expect("Failed to build services");
    let app_state = AppState::new(services, app_config);

    TestApp {
        app: app(Arc::new(app_state)),
        server,
        _token: token,
        _key: key_file,
    }
}

/// Firestore page body holding one document per token.
pub fn documents(tokens: &[&str]) -> String {
    let documents: Vec<_> = tokens
        .iter()
        .map(|t| serde_json::json!({"name": "doc", "fields": {"token": {"stringValue": t}}}))
        .collect();
    serde_json::json!({ "documents": documents }).to_string()
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}
