// src/client.rs

use crate::auth::TokenProvider;
use crate::config::UsergridConfig;
use crate::error::UsergridError;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// The main client for talking to one Usergrid application.
///
/// `UsergridClient` owns the application root URL (`<base>/<org>/<app>/`), the underlying
/// `reqwest::Client`, and an optional [`TokenProvider`] whose token is sent as
/// `Authorization: Bearer <token>` on every request. Cloning is cheap and clones share
/// the connection pool, so a per-user client can be derived from an application client
/// with [`with_token_provider`](UsergridClient::with_token_provider).
///
/// ```rust,no_run
/// use usergrid_rs::{UsergridClient, UsergridConfig, UsergridError, UsergridQuery};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), UsergridError> {
/// let config = UsergridConfig::new("http://localhost:8080", "myorg", "sandbox");
/// let client = UsergridClient::new(config)?;
///
/// let mut query = UsergridQuery::new();
/// (&mut query).eq("author", "Hemingway");
/// let mut books = client.iterate("books", &query).await?;
/// while books.has_next_entity() {
///     let book = books.get_next_entity().await?;
///     println!("{:?}", book.get("title"));
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UsergridClient {
    pub(crate) config: UsergridConfig,
    pub(crate) app_url: Url,
    pub(crate) http_client: Client,
    pub(crate) token_provider: Option<Arc<dyn TokenProvider>>,
}

impl UsergridClient {
    /// Creates a client from `config`.
    ///
    /// Fails with `InvalidInput`/`InvalidUrl` when the configuration cannot produce a
    /// valid application URL, or `Transport` if the HTTP client cannot be built.
    pub fn new(config: UsergridConfig) -> Result<Self, UsergridError> {
        let app_url = config.application_url()?;

        let mut default_headers = HeaderMap::new();
        if let Some(agent) = &config.user_agent {
            default_headers.insert(
                USER_AGENT,
                HeaderValue::from_str(agent).map_err(UsergridError::InvalidHeaderValue)?,
            );
        }

        let mut builder = Client::builder().default_headers(default_headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(UsergridError::Transport)?;

        log::debug!("UsergridClient initialized with application URL: {}", app_url);

        Ok(Self {
            config,
            app_url,
            http_client,
            token_provider: None,
        })
    }

    /// Returns this client with `provider` supplying the bearer token.
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Replaces or clears the token provider in place.
    pub fn set_token_provider(&mut self, provider: Option<Arc<dyn TokenProvider>>) {
        self.token_provider = provider;
    }

    /// Whether requests from this client will currently carry a bearer token.
    pub fn is_authenticated(&self) -> bool {
        self.token_provider
            .as_ref()
            .and_then(|p| p.bearer_token())
            .is_some()
    }

    pub fn config(&self) -> &UsergridConfig {
        &self.config
    }

    /// The application root every endpoint is resolved against.
    pub fn app_url(&self) -> &Url {
        &self.app_url
    }

    pub(crate) fn endpoint_url(&self, endpoint: &str) -> Result<Url, UsergridError> {
        self.app_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| {
                UsergridError::InvalidUrl(format!(
                    "Failed to join application URL '{}' with endpoint '{}': {}",
                    self.app_url, endpoint, e
                ))
            })
    }

    // Central request method. Every call performs exactly one HTTP exchange.
    pub(crate) async fn _request<
        T: Serialize + Send + Sync + ?Sized,
        R: DeserializeOwned + Send + 'static,
    >(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(String, String)],
        body: Option<&T>,
        authenticated: bool,
    ) -> Result<R, UsergridError> {
        let mut full_url = self.endpoint_url(endpoint)?;
        if !params.is_empty() {
            let mut pairs = full_url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = HeaderMap::new();
        if authenticated {
            if let Some(token) = self.token_provider.as_ref().and_then(|p| p.bearer_token()) {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", token))
                        .map_err(UsergridError::InvalidHeaderValue)?,
                );
            }
        }

        let mut request_builder = self.http_client.request(method.clone(), full_url.clone());

        let mut body_str_for_log: Option<String> = None;
        if let Some(body_data) = body {
            let body_str = serde_json::to_string(body_data).map_err(UsergridError::JsonError)?;
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            if log::log_enabled!(log::Level::Debug) {
                body_str_for_log = Some(body_str.clone());
            }
            request_builder = request_builder.body(body_str);
        }

        request_builder = request_builder.headers(headers);

        log::debug!(
            "Sending request: Method={}, URL={}, Authenticated={}",
            method,
            full_url,
            authenticated && self.is_authenticated()
        );
        if let Some(log_body) = &body_str_for_log {
            log::debug!("Request body: {}", log_body);
        }

        let response = request_builder
            .send()
            .await
            .map_err(UsergridError::Transport)?;

        self._send_and_process_response(response, endpoint).await
    }
}
