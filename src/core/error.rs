use thiserror::Error;

/// Failures that abort a whole operation. Once a dispatch is sending,
/// any of these raised for one recipient is recorded in the report as
/// that recipient's failure instead.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("token exchange rejected: {0}")]
    Auth(String),

    #[error("upstream unreachable: {0}")]
    Unavailable(String),

    #[error("recipient listing failed: {0}")]
    Directory(String),

    #[error("invalid message: {0}")]
    Validation(String),

    #[error(
        "topic subscription rejected{}: {body}",
        .status.map(|s| format!(" ({s})")).unwrap_or_default()
    )]
    Registration { status: Option<u16>, body: String },
}
