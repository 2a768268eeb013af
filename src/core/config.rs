use std::env;
use std::path::PathBuf;

use super::DispatchError;

pub const FCM_API_URL: &str = "https://fcm.googleapis.com";
pub const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com";
pub const IID_API_URL: &str = "https://iid.googleapis.com";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub service_account_path: PathBuf,
    // Falls back to the `project_id` in the service account key
    pub project_id: Option<String>,
    pub collection: String,
    pub token_field: String,
    pub page_size: usize,
    pub default_topic: String,
    pub fcm_api_url: String,
    pub firestore_api_url: String,
    pub iid_api_url: String,
    pub progress_interval: usize,
    pub max_failure_samples: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_account_path: PathBuf::from("./service-account.json"),
            project_id: None,
            collection: String::from("fcm_tokens"),
            token_field: String::from("token"),
            page_size: 300,
            default_topic: String::from("all"),
            fcm_api_url: FCM_API_URL.to_string(),
            firestore_api_url: FIRESTORE_API_URL.to_string(),
            iid_api_url: IID_API_URL.to_string(),
            progress_interval: 5,
            max_failure_samples: 20,
        }
    }
}

impl AppConfig {
    /// Read the configuration from `PUSHCAST_*` environment variables,
    /// using the defaults for anything unset.
    pub fn from_env() -> Result<Self, DispatchError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, DispatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            service_account_path: var("PUSHCAST_SERVICE_ACCOUNT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.service_account_path),
            project_id: var("PUSHCAST_PROJECT_ID"),
            collection: var("PUSHCAST_COLLECTION").unwrap_or(defaults.collection),
            token_field: var("PUSHCAST_TOKEN_FIELD").unwrap_or(defaults.token_field),
            page_size: parse_count(
                "PUSHCAST_PAGE_SIZE",
                var("PUSHCAST_PAGE_SIZE"),
                defaults.page_size,
            )?,
            default_topic: var("PUSHCAST_DEFAULT_TOPIC").unwrap_or(defaults.default_topic),
            fcm_api_url: var("PUSHCAST_FCM_API_URL").unwrap_or(defaults.fcm_api_url),
            firestore_api_url: var("PUSHCAST_FIRESTORE_API_URL")
                .unwrap_or(defaults.firestore_api_url),
            iid_api_url: var("PUSHCAST_IID_API_URL").unwrap_or(defaults.iid_api_url),
            progress_interval: parse_count(
                "PUSHCAST_PROGRESS_INTERVAL",
                var("PUSHCAST_PROGRESS_INTERVAL"),
                defaults.progress_interval,
            )?,
            max_failure_samples: parse_count(
                "PUSHCAST_MAX_FAILURE_SAMPLES",
                var("PUSHCAST_MAX_FAILURE_SAMPLES"),
                defaults.max_failure_samples,
            )?,
        })
    }
}

fn parse_count(name: &str, raw: Option<String>, default: usize) -> Result<usize, DispatchError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(DispatchError::Configuration(format!(
            "{} must be a positive integer, got {:?}",
            name, raw
        ))),
    }
}
