// src/config.rs

use crate::error::UsergridError;
use std::time::Duration;
use url::Url;

/// Page size used when neither the query nor the configuration sets one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Connection settings for one Usergrid application.
///
/// A `UsergridConfig` is passed explicitly to [`UsergridClient::new`](crate::UsergridClient::new);
/// there is no process-wide default instance.
///
/// ```rust
/// use usergrid_rs::UsergridConfig;
/// use std::time::Duration;
///
/// let config = UsergridConfig::new("https://api.usergrid.com", "myorg", "sandbox")
///     .page_size(50)
///     .timeout(Duration::from_secs(10));
/// assert_eq!(config.page_size, 50);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UsergridConfig {
    /// Base URL of the Usergrid server, without org and app segments.
    pub base_url: String,
    /// Organization name or UUID.
    pub org: String,
    /// Application name or UUID.
    pub app: String,
    /// Entities requested per page when the query does not set a limit.
    pub page_size: u32,
    /// Per-request timeout handed to the HTTP client. `None` keeps reqwest's default.
    pub timeout: Option<Duration>,
    /// Optional `User-Agent` header value.
    pub user_agent: Option<String>,
}

impl UsergridConfig {
    pub fn new(base_url: &str, org: &str, app: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            org: org.to_string(),
            app: app.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: None,
            user_agent: None,
        }
    }

    /// Reads `USERGRID_BASE_URL`, `USERGRID_ORG`, `USERGRID_APP` and the optional
    /// `USERGRID_PAGE_SIZE` from the environment.
    pub fn from_env() -> Result<Self, UsergridError> {
        let read = |key: &str| {
            std::env::var(key)
                .map_err(|_| UsergridError::InvalidInput(format!("{} is not set", key)))
        };
        let mut config = Self::new(
            &read("USERGRID_BASE_URL")?,
            &read("USERGRID_ORG")?,
            &read("USERGRID_APP")?,
        );
        if let Ok(raw) = std::env::var("USERGRID_PAGE_SIZE") {
            let size = raw.parse::<u32>().map_err(|e| {
                UsergridError::InvalidInput(format!("USERGRID_PAGE_SIZE '{}': {}", raw, e))
            })?;
            config = config.page_size(size);
        }
        Ok(config)
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    /// Checks the settings and returns the application root, e.g.
    /// `https://api.usergrid.com/myorg/sandbox/`.
    ///
    /// A missing scheme defaults to `http://`. The trailing slash is always present so
    /// relative collection paths can be joined onto it.
    pub(crate) fn application_url(&self) -> Result<Url, UsergridError> {
        if self.org.trim().is_empty() {
            return Err(UsergridError::InvalidInput(
                "Organization cannot be empty".to_string(),
            ));
        }
        if self.app.trim().is_empty() {
            return Err(UsergridError::InvalidInput(
                "Application cannot be empty".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(UsergridError::InvalidInput(
                "Page size must be greater than zero".to_string(),
            ));
        }

        let mut base = self.base_url.trim().to_string();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            base = format!("http://{}", base);
        }
        let base = base.trim_end_matches('/');
        let root = format!(
            "{}/{}/{}/",
            base,
            self.org.trim_matches('/'),
            self.app.trim_matches('/')
        );

        let url = Url::parse(&root)?;
        if url.cannot_be_a_base() {
            return Err(UsergridError::InvalidUrl(format!(
                "'{}' cannot be used as a base URL",
                self.base_url
            )));
        }
        Ok(url)
    }
}
