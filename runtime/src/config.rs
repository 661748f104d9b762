//! Runtime configuration.
//!
//! [`StoreConfig`] tunes the store's observation channels. [`HttpConfig`]
//! configures the bundled [`ReqwestHttpClient`](crate::http::ReqwestHttpClient)
//! and can be loaded from the environment.

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the API base URL
pub const BASE_URL_VAR: &str = "REVUX_API_BASE_URL";

/// Environment variable holding the request timeout in milliseconds
pub const TIMEOUT_MS_VAR: &str = "REVUX_API_TIMEOUT_MS";

/// Errors from loading configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value that cannot be parsed
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Configuration for [`Store`](crate::store::Store) instances
///
/// # Example
///
/// ```
/// use revux_runtime::config::StoreConfig;
///
/// let config = StoreConfig::default().with_event_capacity(256);
/// assert_eq!(config.event_capacity, 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Number of events buffered for each slow event subscriber
    pub event_capacity: usize,
}

impl StoreConfig {
    /// Create a configuration with custom values
    #[must_use]
    pub const fn new(event_capacity: usize) -> Self {
        Self { event_capacity }
    }

    /// Set the event broadcast capacity (clamped to at least 1)
    #[must_use]
    pub const fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { event_capacity: 64 }
    }
}

/// Configuration for the bundled HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Prefix for relative request URLs
    pub base_url: Option<String>,
    /// Default request timeout
    pub timeout: Duration,
    /// Headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl HttpConfig {
    /// Default timeout for API requests
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Load from `REVUX_API_BASE_URL` and `REVUX_API_TIMEOUT_MS`
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the timeout is not a number of
    /// milliseconds, or [`ConfigError::Validation`] if the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(BASE_URL_VAR) {
            config.base_url = Some(url);
        }

        if let Some(raw) = lookup(TIMEOUT_MS_VAR) {
            let millis = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: TIMEOUT_MS_VAR,
                value: raw.clone(),
            })?;
            config.timeout = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the default timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a default header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Check the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a zero timeout or an empty base
    /// URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::Validation("timeout must be positive".to_string()));
        }
        if self.base_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            return Err(ConfigError::Validation("base URL must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve a request URL against the base URL
    #[must_use]
    pub fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !url.starts_with("http://") && !url.starts_with("https://") => {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    url.trim_start_matches('/')
                )
            },
            _ => url.to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Self::DEFAULT_TIMEOUT,
            headers: BTreeMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
        }
    }
}
