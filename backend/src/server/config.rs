//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration;

use academy::domain::{LessonProgressConfig, RetryPolicy};
use academy::inbound::http::health::{AdapterKind, Wiring};
use academy::outbound::persistence::DbPool;
use actix_web::cookie::{Key, SameSite};
use url::Url;
use zeroize::Zeroizing;

/// Stripe connection details. Absent means the fixture gateway is used.
pub struct BillingConfig {
    pub(crate) api_base: Url,
    pub(crate) secret_key: Zeroizing<String>,
    pub(crate) timeout: Duration,
}

impl BillingConfig {
    #[must_use]
    pub fn new(api_base: Url, secret_key: Zeroizing<String>, timeout: Duration) -> Self {
        Self {
            api_base,
            secret_key,
            timeout,
        }
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) billing: Option<BillingConfig>,
    pub(crate) progress: LessonProgressConfig,
    pub(crate) retry: RetryPolicy,
}

impl ServerConfig {
    /// Construct a server configuration using application preferences.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            db_pool: None,
            billing: None,
            progress: LessonProgressConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// When provided, the server runs the progress, gamification and
    /// subscription services over Diesel repositories instead of fixtures.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Talk to Stripe instead of the fixture billing gateway.
    #[must_use]
    pub fn with_billing(mut self, billing: BillingConfig) -> Self {
        self.billing = Some(billing);
        self
    }

    /// Cool-down, completion threshold and store retry for progress writes.
    #[must_use]
    pub fn with_progress_config(mut self, progress: LessonProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    /// Backoff applied to billing provider calls.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Adapters the HTTP state builder will select.
    ///
    /// Stripe is only used alongside the database, since subscription state is
    /// mirrored into company rows.
    #[must_use]
    pub fn wiring(&self) -> Wiring {
        let store = if self.db_pool.is_some() {
            AdapterKind::Postgres
        } else {
            AdapterKind::Fixture
        };
        let billing = if self.db_pool.is_some() && self.billing.is_some() {
            AdapterKind::Stripe
        } else {
            AdapterKind::Fixture
        };
        Wiring { store, billing }
    }

    /// Return the socket address the server will bind to.
    #[cfg_attr(
        not(any(test, doctest)),
        expect(dead_code, reason = "Exercised by bootstrap tests")
    )]
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
