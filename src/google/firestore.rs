//! Recipient directory backed by a Firestore collection.
//!
//! Each document in the collection holds one registration token in a
//! string field. Listing walks every page of the collection via the REST
//! API and only returns once the last page (the one without a
//! `nextPageToken`) has been read.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::oauth::{CredentialProvider, DATASTORE_SCOPE};
use crate::core::DispatchError;

#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Every recipient identifier currently on record, in store order.
    /// Duplicates are kept.
    async fn list_all(&self) -> Result<Vec<String>, DispatchError>;
}

#[derive(Debug, Deserialize)]
struct FieldValue {
    #[serde(rename = "stringValue")]
    string_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

pub struct FirestoreDirectory {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    collection_url: String,
    field: String,
    page_size: usize,
}

impl FirestoreDirectory {
    pub fn new(
        client: Client,
        credentials: Arc<dyn CredentialProvider>,
        api_url: &str,
        project_id: &str,
        collection: &str,
        field: &str,
        page_size: usize,
    ) -> Self {
        let collection_url = format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            api_url.trim_end_matches('/'),
            project_id,
            collection
        );
        Self {
            client,
            credentials,
            collection_url,
            field: field.to_string(),
            page_size,
        }
    }

    fn page_url(&self, cursor: Option<&str>) -> String {
        match cursor {
            Some(cursor) => format!(
                "{}?pageSize={}&pageToken={}",
                self.collection_url,
                self.page_size,
                urlencoding::encode(cursor)
            ),
            None => format!("{}?pageSize={}", self.collection_url, self.page_size),
        }
    }

    async fn fetch_page(
        &self,
        cursor: Option<&str>,
    ) -> Result<ListDocumentsResponse, DispatchError> {
        let token = self.credentials.acquire(&[DATASTORE_SCOPE]).await?;
        let url = self.page_url(cursor);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&token.token)
            .send()
            .await
            .map_err(|e| DispatchError::Directory(format!("request failed: {}", e)))?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DispatchError::Directory(format!("{} ({})", status, text)));
        }
        serde_json::from_str(&text)
            .map_err(|e| DispatchError::Directory(format!("unexpected listing response: {}", e)))
    }

    fn extract(&self, mut document: Document) -> Option<String> {
        document
            .fields
            .remove(&self.field)
            .and_then(|value| value.string_value)
            .filter(|token| !token.is_empty())
    }
}

#[async_trait]
impl RecipientDirectory for FirestoreDirectory {
    async fn list_all(&self) -> Result<Vec<String>, DispatchError> {
        let mut recipients = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            let page = self.fetch_page(cursor.as_deref()).await?;
            pages += 1;
            let total = page.documents.len();
            let found: Vec<String> = page
                .documents
                .into_iter()
                .filter_map(|doc| self.extract(doc))
                .collect();
            if found.len() < total {
                tracing::debug!(
                    "Skipped {} document(s) without a '{}' value",
                    total - found.len(),
                    self.field
                );
            }
            recipients.extend(found);

            match page.next_page_token {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        tracing::info!("Found {} recipient(s) across {} page(s)", recipients.len(), pages);
        Ok(recipients)
    }
}
