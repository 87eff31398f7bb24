use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEV_BASE_URL: &str = "http://localhost:4000";
const PROD_BASE_URL: &str = "https://getprep.onrender.com";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unknown PREP_ENV value: {0}")]
    UnknownEnvironment(String),
    #[error("invalid API base URL {raw}: {source}")]
    InvalidBaseUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid PREP_HTTP_TIMEOUT_MS value: {0}")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "dev" | "development" => Ok(Self::Dev),
            "prod" | "production" => Ok(Self::Prod),
            _ => Err(ConfigError::UnknownEnvironment(raw.to_owned())),
        }
    }

    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Dev => DEV_BASE_URL,
            Self::Prod => PROD_BASE_URL,
        }
    }
}

/// Connection settings for the remote Exam API.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if `base_url` does not parse.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            token: token.filter(|t| !t.trim().is_empty()),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `PREP_ENV`, `PREP_API_URL`, `PREP_API_TOKEN` and `PREP_HTTP_TIMEOUT_MS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for values that do not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for values that do not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = lookup("PREP_ENV")
            .map(|raw| Environment::parse(&raw))
            .transpose()?
            .unwrap_or_default();

        let base_url = lookup("PREP_API_URL")
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| environment.base_url().to_owned());

        let timeout = match lookup("PREP_HTTP_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| ConfigError::InvalidTimeout(raw.clone()))?,
            None => Duration::from_millis(DEFAULT_TIMEOUT_MS),
        };

        Ok(Self::new(&base_url, lookup("PREP_API_TOKEN"))?.with_timeout(timeout))
    }
}

// `Url::join` drops the last path segment unless the base ends with a slash.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&normalized).map_err(|source| ConfigError::InvalidBaseUrl {
        raw: raw.to_owned(),
        source,
    })
}
