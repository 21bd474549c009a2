// src/auth.rs

use crate::client::UsergridClient;
use crate::error::UsergridError;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Supplies the bearer token attached to outgoing requests.
///
/// The SDK asks the provider once per request and never refreshes tokens itself.
/// Implementations that renew tokens in the background must do so on their own.
pub trait TokenProvider: Send + Sync + Debug {
    /// The current access token, or `None` to send the request unauthenticated.
    fn bearer_token(&self) -> Option<String>;
}

/// An OAuth2 access token as returned by the `token` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessToken {
    pub access_token: String,
    /// Lifetime in seconds, when the server reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// The authenticated user record for password grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

impl AccessToken {
    pub fn new(access_token: &str) -> Self {
        AccessToken {
            access_token: access_token.to_string(),
            expires_in: None,
            user: None,
        }
    }
}

impl TokenProvider for AccessToken {
    fn bearer_token(&self) -> Option<String> {
        if self.access_token.is_empty() {
            None
        } else {
            Some(self.access_token.clone())
        }
    }
}

/// Credentials exchanged for an [`AccessToken`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub enum Grant {
    /// App user login.
    Password { username: String, password: String },
    /// Application-level client id and secret.
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
}

impl Grant {
    pub fn password(username: &str, password: &str) -> Self {
        Grant::Password {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn client_credentials(client_id: &str, client_secret: &str) -> Self {
        Grant::ClientCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }

    fn validate(&self) -> Result<(), UsergridError> {
        let (first, second) = match self {
            Grant::Password { username, password } => (username, password),
            Grant::ClientCredentials {
                client_id,
                client_secret,
            } => (client_id, client_secret),
        };
        if first.is_empty() || second.is_empty() {
            return Err(UsergridError::InvalidInput(
                "Grant credentials cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl UsergridClient {
    /// Exchanges `grant` for an access token via `POST <org>/<app>/token`.
    ///
    /// The token is returned, not installed. Pass it to
    /// [`with_token_provider`](UsergridClient::with_token_provider) to authenticate
    /// subsequent requests.
    pub async fn request_token(&self, grant: &Grant) -> Result<AccessToken, UsergridError> {
        grant.validate()?;
        self._request(Method::POST, "token", &[], Some(grant), false)
            .await
    }

    /// Convenience for `request_token` followed by `with_token_provider`.
    pub async fn authenticate(&self, grant: &Grant) -> Result<UsergridClient, UsergridError> {
        let token = self.request_token(grant).await?;
        log::debug!("Obtained access token (expires_in={:?})", token.expires_in);
        Ok(self.clone().with_token_provider(Arc::new(token)))
    }
}
