//! Service account credentials for the Google APIs.
//!
//! Every call to `acquire` signs a fresh JWT assertion with the service
//! account's private key and exchanges it at the key's `token_uri` for a
//! short-lived bearer token (the OAuth2 JWT bearer grant). Nothing is
//! cached between calls.
use std::fmt;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::DispatchError;

pub const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The JSON key file downloaded from the Firebase console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

// Hand-written so the private key never ends up in logs
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, DispatchError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            DispatchError::Configuration(format!(
                "cannot read service account key {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, DispatchError> {
        serde_json::from_str(raw).map_err(|e| {
            DispatchError::Configuration(format!("invalid service account key: {}", e))
        })
    }
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Obtain a bearer token for `scopes`. Implementations may hit the
    /// network on every call so callers should ask once per request.
    async fn acquire(&self, scopes: &[&str]) -> Result<AccessToken, DispatchError>;
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug)]
pub struct ServiceAccountCredentials {
    key: ServiceAccountKey,
    client: Client,
}

impl ServiceAccountCredentials {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self::with_client(key, Client::new())
    }

    pub fn with_client(key: ServiceAccountKey, client: Client) -> Self {
        Self { key, client }
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    fn sign_assertion(
        &self,
        scopes: &[&str],
        now: DateTime<Utc>,
    ) -> Result<String, DispatchError> {
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| DispatchError::Configuration(format!("invalid private key: {}", e)))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| DispatchError::Configuration(format!("cannot sign assertion: {}", e)))
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccountCredentials {
    async fn acquire(&self, scopes: &[&str]) -> Result<AccessToken, DispatchError> {
        let now = Utc::now();
        let assertion = self.sign_assertion(scopes, now)?;

        let res = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| DispatchError::Unavailable(format!("token endpoint: {}", e)))?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DispatchError::Auth(format!("{} ({})", status, text)));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| DispatchError::Auth(format!("unexpected token response: {}", e)))?;
        let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                DispatchError::Auth(format!("token lifetime out of range: {}", lifetime))
            })?;
        tracing::debug!(
            "Issued access token for {} valid for {}s",
            self.key.client_email,
            lifetime
        );

        Ok(AccessToken {
            token: token.access_token,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    const TEST_PRIVATE_KEY: &str = include_str!("../../tests/fixtures/test_key.pem");

    fn test_key(token_uri: &str, private_key: &str) -> ServiceAccountKey {
        let raw = serde_json::json!({
            "type": "service_account",
            "project_id": "demo-project",
            "private_key_id": "key-1",
            "private_key": private_key,
            "client_email": "pushcast@demo-project.iam.gserviceaccount.com",
            "token_uri": token_uri,
        });
        ServiceAccountKey::from_json(&raw.to_string()).unwrap()
    }

    #[test]
    fn test_key_defaults_token_uri() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email": "a@b.c", "private_key": "pem"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
        assert!(key.project_id.is_none());
    }

    #[test]
    fn test_debug_hides_private_key() {
        let key = test_key("http://localhost/token", TEST_PRIVATE_KEY);
        let printed = format!("{:?}", key);
        assert!(!printed.contains("PRIVATE KEY"));
        assert!(printed.contains("pushcast@demo-project"));
    }

    #[test]
    fn test_missing_key_file_is_configuration_error() {
        let err = ServiceAccountKey::from_file(Path::new("/nonexistent/service-account.json"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
    }

    #[test]
    fn test_malformed_key_file_is_configuration_error() {
        let err = ServiceAccountKey::from_json(r#"{"client_email": 1}"#).unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(_)));
    }

    #[test]
    fn test_assertion_is_signed_with_key_id() {
        let credentials =
            ServiceAccountCredentials::new(test_key("http://localhost/token", TEST_PRIVATE_KEY));
        let jwt = credentials
            .sign_assertion(&[MESSAGING_SCOPE], Utc::now())
            .unwrap();
        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("key-1"));
    }

    #[tokio::test]
    async fn test_acquire_exchanges_assertion_for_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(
                    "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer".to_string(),
                ),
                Matcher::Regex("assertion=".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.test", "expires_in": 3599, "token_type": "Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let token_uri = format!("{}/token", server.url());
        let credentials = ServiceAccountCredentials::new(test_key(&token_uri, TEST_PRIVATE_KEY));
        let token = credentials
            .acquire(&[MESSAGING_SCOPE, DATASTORE_SCOPE])
            .await
            .unwrap();

        assert_eq!(token.token, "ya29.test");
        assert_eq!(token.scopes, vec![MESSAGING_SCOPE, DATASTORE_SCOPE]);
        assert!(!token.is_expired());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_acquire_does_not_reuse_tokens() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "ya29.test", "expires_in": 3599}"#)
            .expect(2)
            .create_async()
            .await;

        let token_uri = format!("{}/token", server.url());
        let credentials = ServiceAccountCredentials::new(test_key(&token_uri, TEST_PRIVATE_KEY));
        credentials.acquire(&[MESSAGING_SCOPE]).await.unwrap();
        credentials.acquire(&[MESSAGING_SCOPE]).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_key_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "invalid_grant", "error_description": "Invalid JWT Signature."}"#)
            .create_async()
            .await;

        let token_uri = format!("{}/token", server.url());
        let credentials = ServiceAccountCredentials::new(test_key(&token_uri, TEST_PRIVATE_KEY));
        let err = credentials.acquire(&[MESSAGING_SCOPE]).await.unwrap_err();

        match err {
            DispatchError::Auth(detail) => assert!(detail.contains("invalid_grant")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unusable_private_key_fails_before_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;

        let token_uri = format!("{}/token", server.url());
        let credentials = ServiceAccountCredentials::new(test_key(&token_uri, "not a pem"));
        let err = credentials.acquire(&[MESSAGING_SCOPE]).await.unwrap_err();

        assert!(matches!(err, DispatchError::Configuration(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(format!(
                r#"{{"access_token": "ya29.test", "expires_in": {}}}"#,
                i64::MAX
            ))
            .create_async()
            .await;

        let token_uri = format!("{}/token", server.url());
        let credentials = ServiceAccountCredentials::new(test_key(&token_uri, TEST_PRIVATE_KEY));
        let err = credentials.acquire(&[MESSAGING_SCOPE]).await.unwrap_err();

        assert!(matches!(err, DispatchError::Auth(_)));
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_is_not_a_rejection() {
        // Nothing listens on port 9 (discard) in the test environment
        let credentials = ServiceAccountCredentials::new(test_key(
            "http://127.0.0.1:9/token",
            TEST_PRIVATE_KEY,
        ));
        let err = credentials.acquire(&[MESSAGING_SCOPE]).await.unwrap_err();

        assert!(matches!(err, DispatchError::Unavailable(_)));
    }
}
