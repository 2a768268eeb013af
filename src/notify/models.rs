use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::DispatchError;

// Upper bound on how much of an error body is kept for diagnostics
pub const MAX_DETAIL_CHARS: usize = 100;
const RECIPIENT_PREFIX_CHARS: usize = 12;

/// Title and body of a notification. Surrounding whitespace is trimmed
/// on construction; emptiness is checked by `validate` so that callers
/// get a `Validation` error instead of a half-built message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    title: String,
    body: String,
}

impl Message {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            body: body.trim().to_string(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.title.is_empty() {
            return Err(DispatchError::Validation(String::from("title is required")));
        }
        if self.body.is_empty() {
            return Err(DispatchError::Validation(String::from("body is required")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryTarget {
    /// Everyone currently on record in the recipient directory
    #[serde(rename = "all")]
    AllRecipients,
    Topic { name: String },
    #[serde(rename = "recipient")]
    SingleRecipient { token: String },
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryTarget::AllRecipients => write!(f, "all recipients"),
            DeliveryTarget::Topic { name } => write!(f, "topic '{}'", name),
            DeliveryTarget::SingleRecipient { token } => {
                write!(f, "recipient {}", recipient_prefix(token))
            }
        }
    }
}

/// Where a single send request is addressed. Exactly one of these is set
/// on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Token(String),
    Topic(String),
}

impl Address {
    /// Short form safe to log or show; never the full registration token.
    pub fn label(&self) -> String {
        match self {
            Address::Token(token) => recipient_prefix(token),
            Address::Topic(name) => format!("/topics/{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        message_id: String,
    },
    // `status` is `None` when no HTTP response was received at all
    Failed {
        status: Option<u16>,
        detail: String,
    },
}

impl DeliveryOutcome {
    pub fn failed(status: Option<u16>, detail: &str) -> Self {
        DeliveryOutcome::Failed {
            status,
            detail: truncate(detail, MAX_DETAIL_CHARS),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSample {
    pub recipient: String,
    pub status: Option<u16>,
    pub detail: String,
}

/// Normalize a topic name, accepting an optional `/topics/` prefix.
pub fn topic_name(raw: &str) -> Result<String, DispatchError> {
    let name = raw.trim();
    let name = name.strip_prefix("/topics/").unwrap_or(name);
    if name.is_empty() {
        return Err(DispatchError::Validation(String::from(
            "topic name is required",
        )));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%'));
    if !valid {
        return Err(DispatchError::Validation(format!(
            "invalid topic name {:?}",
            name
        )));
    }
    Ok(name.to_string())
}

pub fn recipient_prefix(token: &str) -> String {
    if token.chars().count() <= RECIPIENT_PREFIX_CHARS {
        return token.to_string();
    }
    format!("{}…", truncate(token, RECIPIENT_PREFIX_CHARS))
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
