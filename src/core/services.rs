use std::sync::Arc;

use reqwest::Client;

use super::{AppConfig, DispatchError};
use crate::google::{
    CredentialProvider, FcmClient, FirestoreDirectory, IidClient, RecipientDirectory,
    ServiceAccountCredentials, ServiceAccountKey, SubscriptionRegistrar,
};
use crate::notify::Dispatcher;

/// The dispatch engine wired to the Google APIs named in `AppConfig`.
#[derive(Clone)]
pub struct Services {
    pub directory: Arc<dyn RecipientDirectory>,
    pub registrar: Arc<dyn SubscriptionRegistrar>,
    pub dispatcher: Arc<Dispatcher>,
}

impl Services {
    /// Load the service account key and build every client. Fails with a
    /// `Configuration` error when the key is missing or unusable, before
    /// any network call is made.
    pub fn from_config(config: &AppConfig) -> Result<Self, DispatchError> {
        let key = ServiceAccountKey::from_file(&config.service_account_path)?;
        let project_id = config
            .project_id
            .clone()
            .or_else(|| key.project_id.clone())
            .ok_or_else(|| {
                DispatchError::Configuration(String::from(
                    "no project id: set PUSHCAST_PROJECT_ID or use a key with a project_id",
                ))
            })?;
        tracing::debug!(
            "Using project {} with service account {}",
            project_id,
            key.client_email
        );

        let client = Client::new();
        let credentials: Arc<dyn CredentialProvider> =
            Arc::new(ServiceAccountCredentials::with_client(key, client.clone()));
        Ok(Self::new(config, &project_id, client, credentials))
    }

    pub fn new(
        config: &AppConfig,
        project_id: &str,
        client: Client,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let directory: Arc<dyn RecipientDirectory> = Arc::new(FirestoreDirectory::new(
            client.clone(),
            Arc::clone(&credentials),
            &config.firestore_api_url,
            project_id,
            &config.collection,
            &config.token_field,
            config.page_size,
        ));
        let sender = Arc::new(FcmClient::new(
            client.clone(),
            Arc::clone(&credentials),
            &config.fcm_api_url,
            project_id,
        ));
        let registrar = Arc::new(IidClient::new(client, credentials, &config.iid_api_url));
        let dispatcher = Dispatcher::new(Arc::clone(&directory), sender)
            .with_progress_interval(config.progress_interval)
            .with_max_failure_samples(config.max_failure_samples);

        Self {
            directory,
            registrar,
            dispatcher: Arc::new(dispatcher),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_key(project_id: Option<&str>) -> tempfile::NamedTempFile {
        let mut raw = serde_json::json!({
            "client_email": "pushcast@demo.iam.gserviceaccount.com",
            "private_key": "unused",
        });
        if let Some(project_id) = project_id {
            raw["project_id"] = serde_json::json!(project_id);
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", raw).unwrap();
        file
    }

    #[test]
    fn test_missing_key_file() {
        let config = AppConfig {
            service_account_path: "/nonexistent/key.json".into(),
            ..Default::default()
        };
        let err = Services::from_config(&config).err().unwrap();
        assert!(matches!(err, DispatchError::Configuration(_)));
    }

    #[test]
    fn test_project_id_required() {
        let key = write_key(None);
        let config = AppConfig {
            service_account_path: key.path().to_path_buf(),
            ..Default::default()
        };
        let err = Services::from_config(&config).err().unwrap();
        assert!(matches!(err, DispatchError::Configuration(_)));

        let config = AppConfig {
            service_account_path: key.path().to_path_buf(),
            project_id: Some(String::from("demo")),
            ..Default::default()
        };
        assert!(Services::from_config(&config).is_ok());
    }

    #[test]
    fn test_project_id_from_key() {
        let key = write_key(Some("from-key"));
        let config = AppConfig {
            service_account_path: key.path().to_path_buf(),
            ..Default::default()
        };
        assert!(Services::from_config(&config).is_ok());
    }
}
