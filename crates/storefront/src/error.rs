//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;
use crate::cart::CartError;
use crate::checkout::ValidationError;

/// Application-level error type for the storefront API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Remote commerce backend failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Cart mutation was rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout preconditions were not met.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A blocking store task panicked or was cancelled.
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Backend(err) => match err {
                BackendError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Cart(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Task(_)
                | Self::Backend(
                    BackendError::Http(_)
                        | BackendError::Api { .. }
                        | BackendError::Parse(_)
                        | BackendError::InvalidUrl(_)
                        | BackendError::Unpriced(_)
                )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Task(_) => "Internal server error".to_string(),
            Self::Backend(BackendError::NotConfigured) => {
                "Remote catalog is not configured".to_string()
            }
            Self::Backend(BackendError::NotFound(_)) => "Not found".to_string(),
            Self::Backend(BackendError::RateLimited(secs)) => {
                format!("Rate limited, retry after {secs} seconds")
            }
            Self::Backend(_) => "External service error".to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Validation(err) => err.to_string(),
        };

        let mut body = json!({ "error": message });
        if let Self::Validation(ValidationError::IncompleteAddress { fields }) = &self {
            body["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
