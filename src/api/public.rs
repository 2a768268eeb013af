//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::core::DispatchError;

// Errors

pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<DispatchError>() {
            Some(DispatchError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            // The upstream Google APIs refused or failed
            Some(DispatchError::Auth(_))
            | Some(DispatchError::Unavailable(_))
            | Some(DispatchError::Directory(_))
            | Some(DispatchError::Registration { .. }) => StatusCode::BAD_GATEWAY,
            Some(DispatchError::Configuration(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        } else {
            tracing::warn!("{}", self.0);
        }

        (status, format!("Something went wrong: {}", self.0)).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` or `Result<_, DispatchError>` to turn them into
/// `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod push {
    pub use crate::api::routes::push::public::*;
}
