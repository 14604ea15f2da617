//! Backend entry-point: loads settings, wires adapters and serves the REST API.

mod server;

use std::env;

use actix_web::cookie::{Key, SameSite};
use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use zeroize::Zeroizing;

use academy::inbound::http::health::HealthState;
use academy::outbound::persistence::{DbPool, PoolConfig};
use academy::settings::AcademySettings;
use server::{BillingConfig, ServerConfig, create_server};

fn load_session_key() -> std::io::Result<Key> {
    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    match std::fs::read(&key_path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(std::io::Error::other(format!(
                    "failed to read session key at {key_path}: {e}"
                )))
            }
        }
    }
}

async fn build_config(settings: &AcademySettings, key: Key) -> std::io::Result<ServerConfig> {
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;
    let progress = settings.progress_config().map_err(std::io::Error::other)?;

    let mut config = ServerConfig::new(
        key,
        settings.session_cookie_secure,
        SameSite::Lax,
        bind_addr,
    )
    .with_progress_config(progress)
    .with_retry_policy(settings.retry_policy());

    match &settings.database_url {
        Some(url) => {
            let mut pool_config = PoolConfig::new(url.as_str());
            if let Some(max) = settings.db_max_connections {
                pool_config = pool_config.with_max_size(max);
            }
            let pool = DbPool::new(pool_config)
                .await
                .map_err(|e| std::io::Error::other(format!("database pool: {e}")))?;
            config = config.with_db_pool(pool);
        }
        None => warn!("ACADEMY_DATABASE_URL not set; serving fixture data"),
    }

    if let Some(secret) = &settings.stripe_secret_key {
        let api_base = settings.stripe_api_base().map_err(std::io::Error::other)?;
        config = config.with_billing(BillingConfig::new(
            api_base,
            Zeroizing::new(secret.clone()),
            settings.stripe_timeout(),
        ));
    }

    Ok(config)
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AcademySettings::load_from_iter(env::args_os())
        .map_err(|e| std::io::Error::other(format!("settings: {e}")))?;
    let key = load_session_key()?;
    let config = build_config(&settings, key).await?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    info!("academy server listening");
    server.await
}
