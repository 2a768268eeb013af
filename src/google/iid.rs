//! Topic subscriptions through the Instance ID `batchAdd` endpoint.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::oauth::{CredentialProvider, MESSAGING_SCOPE};
use crate::core::DispatchError;
use crate::notify::{recipient_prefix, topic_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionOutcome {
    pub topic: String,
}

#[async_trait]
pub trait SubscriptionRegistrar: Send + Sync {
    async fn subscribe(
        &self,
        identifier: &str,
        topic: &str,
    ) -> Result<SubscriptionOutcome, DispatchError>;
}

#[derive(Serialize)]
struct BatchAddRequest<'a> {
    to: String,
    registration_tokens: [&'a str; 1],
}

#[derive(Deserialize)]
struct BatchAddResponse {
    #[serde(default)]
    results: Vec<RegistrationResult>,
}

// An empty object means the token was registered
#[derive(Deserialize)]
struct RegistrationResult {
    error: Option<String>,
}

pub struct IidClient {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    batch_add_url: String,
}

impl IidClient {
    pub fn new(client: Client, credentials: Arc<dyn CredentialProvider>, api_url: &str) -> Self {
        Self {
            client,
            credentials,
            batch_add_url: format!("{}/iid/v1:batchAdd", api_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl SubscriptionRegistrar for IidClient {
    async fn subscribe(
        &self,
        identifier: &str,
        topic: &str,
    ) -> Result<SubscriptionOutcome, DispatchError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(DispatchError::Validation(String::from(
                "recipient token is required",
            )));
        }
        let topic = topic_name(topic)?;

        let token = self.credentials.acquire(&[MESSAGING_SCOPE]).await?;
        let request = BatchAddRequest {
            to: format!("/topics/{}", topic),
            registration_tokens: [identifier],
        };
        let res = self
            .client
            .post(&self.batch_add_url)
            .bearer_auth(&token.token)
            .header("access_token_auth", "true")
            .json(&request)
            .send()
            .await
            .map_err(|e| DispatchError::Registration {
                status: None,
                body: e.to_string(),
            })?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if status != StatusCode::OK {
            return Err(DispatchError::Registration {
                status: Some(status.as_u16()),
                body: text,
            });
        }

        let rejected = |body: String| DispatchError::Registration {
            status: Some(status.as_u16()),
            body,
        };
        let parsed: BatchAddResponse =
            serde_json::from_str(&text).map_err(|_| rejected(text.clone()))?;
        match parsed.results.first() {
            Some(RegistrationResult { error: None }) => {
                tracing::info!(
                    "Subscribed {} to topic '{}'",
                    recipient_prefix(identifier),
                    topic
                );
                Ok(SubscriptionOutcome { topic })
            }
            Some(RegistrationResult { error: Some(error) }) => Err(rejected(error.clone())),
            None => Err(rejected(text)),
        }
    }
}
