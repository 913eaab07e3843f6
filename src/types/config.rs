//! Configuration structures.
//!
//! Configuration is assembled once at startup (CLI flags with environment
//! fallbacks) and passed by reference into the components that need it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::errors::{Error, Result};

/// Default public API endpoint of the platform.
pub const DEFAULT_BASE_URL: &str = "https://api.geny.io/cloud";

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote platform configuration.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Local ADB bridge configuration.
    #[serde(default)]
    pub adb: AdbConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        self.platform.validate()?;
        if self.adb.program.as_os_str().is_empty() {
            return Err(Error::configuration("adb program path cannot be empty"));
        }
        if self.adb.command_timeout.is_zero() {
            return Err(Error::configuration("adb command timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Bearer token for the platform API.
///
/// Never printed: `Debug` is redacted and the value is skipped on serialization.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("ApiToken(<unset>)")
        } else {
            f.write_str("ApiToken(<redacted>)")
        }
    }
}

/// Remote platform configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the public API (no trailing slash required).
    pub base_url: String,

    /// Bearer token, read once at startup.
    #[serde(default, skip_serializing)]
    pub api_token: ApiToken,

    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Fixed delay before the single retry of a transient failure.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Retry idempotent requests once on 5xx / network failure.
    pub retry_transient: bool,
}

impl PlatformConfig {
    pub fn new(base_url: impl Into<String>, api_token: ApiToken) -> Self {
        Self {
            base_url: base_url.into(),
            api_token,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::configuration(
                "GENYMOTION_API_TOKEN is not set; a non-empty API token is required",
            ));
        }
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration(format!("invalid platform base URL '{}': {}", self.base_url, e))
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::configuration(format!(
                "invalid platform base URL '{}': not a hierarchical URL",
                self.base_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::configuration("HTTP request timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: ApiToken::default(),
            request_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(500),
            retry_transient: true,
        }
    }
}

/// Local ADB bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdbConfig {
    /// ADB executable; a bare name is resolved through `PATH`.
    pub program: PathBuf,

    /// Deadline for a single `adb connect` / `adb disconnect`.
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("adb"),
            command_timeout: Duration::from_secs(10),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error), used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
