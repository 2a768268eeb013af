//! Firebase Cloud Messaging HTTP v1 sender.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::oauth::{CredentialProvider, MESSAGING_SCOPE};
use crate::core::DispatchError;
use crate::notify::{Address, DeliveryOutcome, Message};

#[async_trait]
pub trait PushSender: Send + Sync {
    /// Deliver `message` to one address.
    ///
    /// Anything that goes wrong with the delivery itself (a rejected
    /// token, an unreachable endpoint, a garbled response) is reported as
    /// `DeliveryOutcome::Failed`. Failing to obtain a bearer token is an
    /// error; the dispatcher still counts it against this address.
    async fn send(
        &self,
        message: &Message,
        address: &Address,
    ) -> Result<DeliveryOutcome, DispatchError>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: OutboundMessage<'a>,
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    notification: Notification<'a>,
}

#[derive(Serialize)]
struct Notification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

impl<'a> SendRequest<'a> {
    fn new(message: &'a Message, address: &'a Address) -> Self {
        let (token, topic) = match address {
            Address::Token(token) => (Some(token.as_str()), None),
            Address::Topic(topic) => (None, Some(topic.as_str())),
        };
        Self {
            message: OutboundMessage {
                token,
                topic,
                notification: Notification {
                    title: message.title(),
                    body: message.body(),
                },
            },
        }
    }
}

/// Map an HTTP response from `messages:send` to an outcome. Only a 200
/// carrying a message name counts as delivered.
fn classify(status: StatusCode, body: &str) -> DeliveryOutcome {
    if status != StatusCode::OK {
        return DeliveryOutcome::failed(Some(status.as_u16()), body);
    }
    match serde_json::from_str::<SendResponse>(body) {
        Ok(res) => DeliveryOutcome::Delivered {
            message_id: res.name,
        },
        Err(e) => DeliveryOutcome::failed(
            Some(status.as_u16()),
            &format!("unexpected send response: {}", e),
        ),
    }
}

pub struct FcmClient {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    send_url: String,
}

impl FcmClient {
    pub fn new(
        client: Client,
        credentials: Arc<dyn CredentialProvider>,
        api_url: &str,
        project_id: &str,
    ) -> Self {
        let send_url = format!(
            "{}/v1/projects/{}/messages:send",
            api_url.trim_end_matches('/'),
            project_id
        );
        Self {
            client,
            credentials,
            send_url,
        }
    }
}

#[async_trait]
impl PushSender for FcmClient {
    async fn send(
        &self,
        message: &Message,
        address: &Address,
    ) -> Result<DeliveryOutcome, DispatchError> {
        let token = self.credentials.acquire(&[MESSAGING_SCOPE]).await?;
        let request = SendRequest::new(message, address);

        let res = match self
            .client
            .post(&self.send_url)
            .bearer_auth(&token.token)
            .json(&request)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => return Ok(DeliveryOutcome::failed(None, &e.to_string())),
        };
        let status = res.status();
        match res.text().await {
            Ok(text) => Ok(classify(status, &text)),
            Err(e) => Ok(DeliveryOutcome::failed(
                Some(status.as_u16()),
                &e.to_string(),
            )),
        }
    }
}
