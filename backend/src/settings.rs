//! Server settings loaded via OrthoConfig.
//!
//! Every value may come from CLI flags, `ACADEMY_*` environment variables or a
//! configuration file. Unset values fall back to the defaults below; accessors
//! validate ranges so startup fails fast on a bad deployment.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{
    CompletionThreshold, DEFAULT_COMPLETION_PERCENT, DEFAULT_PROGRESS_COOLDOWN,
    LessonProgressConfig, RetryPolicy,
};
use crate::outbound::billing::DEFAULT_STRIPE_API_BASE;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STRIPE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while turning raw settings into typed configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The listen address is not a `host:port` socket address.
    #[error("invalid bind address {value}: {source}")]
    BindAddr {
        /// Raw configured value.
        value: String,
        /// Parser failure.
        source: std::net::AddrParseError,
    },
    /// The completion threshold lies outside `1..=100`.
    #[error("completion percent must be between 1 and 100, got {0}")]
    CompletionPercent(u8),
    /// The Stripe base override is not an absolute URL.
    #[error("invalid Stripe API base {value}: {source}")]
    StripeBase {
        /// Raw configured value.
        value: String,
        /// Parser failure.
        source: url::ParseError,
    },
}

/// Runtime settings for the academy server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ACADEMY")]
pub struct AcademySettings {
    /// Mark the session cookie `Secure`. Disable only for plain-HTTP development.
    #[ortho_config(default = true)]
    pub session_cookie_secure: bool,
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string. Fixture adapters are used when absent.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Minimum spacing between accepted progress samples, in milliseconds.
    pub progress_cooldown_ms: Option<u64>,
    /// Watch percentage at which a lesson completes automatically.
    pub completion_percent: Option<u8>,
    /// Attempts per store or billing call, including the first.
    pub retry_max_attempts: Option<u32>,
    /// Delay before the first retry, in milliseconds.
    pub retry_initial_backoff_ms: Option<u64>,
    /// Upper bound for any retry delay, in milliseconds.
    pub retry_max_backoff_ms: Option<u64>,
    /// Stripe secret key. The fixture gateway is used when absent.
    pub stripe_secret_key: Option<String>,
    /// Stripe REST base URL override.
    pub stripe_api_base: Option<String>,
    /// Per-request Stripe timeout, in milliseconds.
    pub stripe_timeout_ms: Option<u64>,
}

impl AcademySettings {
    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|source| SettingsError::BindAddr {
            value: raw.to_owned(),
            source,
        })
    }

    /// Backoff shared by the progress store and the billing provider.
    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.retry_max_attempts.unwrap_or(defaults.max_attempts),
            initial_backoff: self
                .retry_initial_backoff_ms
                .map_or(defaults.initial_backoff, Duration::from_millis),
            max_backoff: self
                .retry_max_backoff_ms
                .map_or(defaults.max_backoff, Duration::from_millis),
        }
    }

    /// Progress reconciliation tunables.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::CompletionPercent`] for `0` or values above
    /// `100`.
    pub fn progress_config(&self) -> Result<LessonProgressConfig, SettingsError> {
        let percent = self
            .completion_percent
            .unwrap_or(DEFAULT_COMPLETION_PERCENT);
        let threshold = CompletionThreshold::new(percent)
            .map_err(|_| SettingsError::CompletionPercent(percent))?;
        Ok(LessonProgressConfig {
            cooldown: self
                .progress_cooldown_ms
                .map_or(DEFAULT_PROGRESS_COOLDOWN, Duration::from_millis),
            threshold,
            retry: self.retry_policy(),
        })
    }

    /// Stripe REST base URL, normalised to end with a slash.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StripeBase`] when the override is not a URL.
    pub fn stripe_api_base(&self) -> Result<Url, SettingsError> {
        let raw = self
            .stripe_api_base
            .as_deref()
            .unwrap_or(DEFAULT_STRIPE_API_BASE);
        let normalised = if raw.ends_with('/') {
            raw.to_owned()
        } else {
            format!("{raw}/")
        };
        Url::parse(&normalised).map_err(|source| SettingsError::StripeBase {
            value: raw.to_owned(),
            source,
        })
    }

    /// Per-request Stripe timeout, falling back to ten seconds.
    pub fn stripe_timeout(&self) -> Duration {
        self.stripe_timeout_ms
            .map_or(DEFAULT_STRIPE_TIMEOUT, Duration::from_millis)
    }
}
