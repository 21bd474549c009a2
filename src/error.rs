// src/error.rs

use reqwest::header::InvalidHeaderValue;
use serde_json::Value;
use thiserror::Error;

/// Error types the server uses for rejected or expired credentials, whatever the HTTP status.
const AUTH_ERROR_TYPES: &[&str] = &[
    "auth_expired_session_token",
    "auth_missing_credentials",
    "auth_invalid",
    "auth_bad_access_token",
    "expired_token",
    "unauthorized",
];

const CONFLICT_ERROR_TYPES: &[&str] = &["duplicate_unique_property_exists"];

#[derive(Error, Debug)]
pub enum UsergridError {
    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication error (HTTP {status}) {error}: {description}")]
    Auth {
        status: u16,
        error: String,
        description: String,
    },

    #[error("Not found (HTTP {status}) {error}: {description}")]
    NotFound {
        status: u16,
        error: String,
        description: String,
    },

    #[error("Conflict (HTTP {status}) {error}: {description}")]
    Conflict {
        status: u16,
        error: String,
        description: String,
    },

    #[error("Validation error (HTTP {status}) {error}: {description}")]
    Validation {
        status: u16,
        error: String,
        description: String,
    },

    #[error("Server error (HTTP {status}) {error}: {description}")]
    Server {
        status: u16,
        error: String,
        description: String,
    },

    #[error("No more entities available from this iterator")]
    Exhausted,

    #[error("URL parsing failed: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("JSON deserialization failed: {0}")]
    JsonDeserializationFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(InvalidHeaderValue),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl UsergridError {
    /// Creates a `UsergridError` from an HTTP status code and the decoded error body.
    ///
    /// Usergrid error bodies look like
    /// `{"error": "<type>", "error_description": "<message>", "exception": "..."}`.
    pub(crate) fn from_response(status_code: u16, response_body: Value) -> Self {
        let error = response_body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown_error")
            .to_string();
        let description = response_body
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error")
            .to_string();

        if status_code == 401 || AUTH_ERROR_TYPES.contains(&error.as_str()) {
            return UsergridError::Auth {
                status: status_code,
                error,
                description,
            };
        }
        if status_code == 409 || CONFLICT_ERROR_TYPES.contains(&error.as_str()) {
            return UsergridError::Conflict {
                status: status_code,
                error,
                description,
            };
        }

        match status_code {
            404 => UsergridError::NotFound {
                status: status_code,
                error,
                description,
            },
            400..=499 => UsergridError::Validation {
                status: status_code,
                error,
                description,
            },
            _ => UsergridError::Server {
                status: status_code,
                error,
                description,
            },
        }
    }

    /// HTTP status of a server-reported error, `None` for local and transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            UsergridError::Auth { status, .. }
            | UsergridError::NotFound { status, .. }
            | UsergridError::Conflict { status, .. }
            | UsergridError::Validation { status, .. }
            | UsergridError::Server { status, .. } => Some(*status),
            UsergridError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The server's error type string (e.g. `duplicate_unique_property_exists`).
    pub fn error_type(&self) -> Option<&str> {
        match self {
            UsergridError::Auth { error, .. }
            | UsergridError::NotFound { error, .. }
            | UsergridError::Conflict { error, .. }
            | UsergridError::Validation { error, .. }
            | UsergridError::Server { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Whether repeating the same call could plausibly succeed. The SDK never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UsergridError::Transport(_) | UsergridError::Server { .. }
        )
    }
}
