//! Apply pending schema migrations to the configured database.
//!
//! Reads `ACADEMY_DATABASE_URL` (or `--database-url`) through the same
//! settings loader as the server.

use std::env;

use academy::settings::AcademySettings;
use color_eyre::eyre::{Context, Result, eyre};
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use ortho_config::OrthoConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn main() -> Result<()> {
    color_eyre::install()?;
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let settings = AcademySettings::load_from_iter(env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let database_url = settings
        .database_url
        .ok_or_else(|| eyre!("ACADEMY_DATABASE_URL must be set to run migrations"))?;

    let mut conn =
        PgConnection::establish(&database_url).wrap_err("failed to connect to the database")?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| eyre!("migration failed: {err}"))?;

    for version in &applied {
        info!(%version, "applied migration");
    }
    info!(count = applied.len(), "database schema is up to date");
    Ok(())
}
