//! Template-cloned databases for the Diesel repository suites.
//!
//! The first suite to run creates `academy_template_<hash>` with every
//! migration applied; each test then clones it, which is far cheaper than
//! migrating a fresh database per test. The hash covers the migrations
//! directory, so editing a migration provisions a new template.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use pg_embedded_setup_unpriv::test_support::hash_directory;
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_NAME_PREFIX: &str = "academy_template";
const PROVISION_RETRIES: usize = 5;
const PROVISION_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Failure while preparing a test database.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Template lookup, creation or cloning failed.
    #[error("template database: {message}")]
    Template { message: String },
    /// Migrations could not be applied to the template.
    #[error("migration: {message}")]
    Migration { message: String },
}

impl HarnessError {
    fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }
}

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn template_database_name() -> Result<String, HarnessError> {
    let hash = hash_directory(migrations_dir())
        .map_err(|err| HarnessError::template(format!("hash migrations: {err}")))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

/// Create the migrated template unless a previous suite already did.
fn ensure_template_database(cluster: &ClusterHandle) -> Result<String, HarnessError> {
    let template_name = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| HarnessError::template(format!("exists check: {err:?}")))?;
    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| HarnessError::template(format!("create: {err:?}")))?;
        migrate_schema(&cluster.connection().database_url(&template_name))?;
    }
    Ok(template_name)
}

fn provision_once(
    cluster: &ClusterHandle,
    attempt: usize,
) -> Result<TemporaryDatabase, HarnessError> {
    let template_name = ensure_template_database(cluster).map_err(|error| {
        HarnessError::template(format!("attempt {attempt}/{PROVISION_RETRIES}: {error}"))
    })?;
    let db_name = format!("test_{}", Uuid::new_v4());
    cluster
        .temporary_database_from_template(db_name.as_str(), template_name.as_str())
        .map_err(|error| {
            HarnessError::template(format!(
                "clone attempt {attempt}/{PROVISION_RETRIES}: {error:?}"
            ))
        })
}

/// Clone a fresh database from the migrated template.
///
/// Retries a few times because concurrent suites can race on template
/// creation while another connection still holds the template open.
pub fn provision_template_database(
    cluster: &ClusterHandle,
) -> Result<TemporaryDatabase, HarnessError> {
    let mut last_error = None;
    for attempt in 1..=PROVISION_RETRIES {
        match provision_once(cluster, attempt) {
            Ok(database) => return Ok(database),
            Err(error) => last_error = Some(error),
        }
        if attempt < PROVISION_RETRIES {
            std::thread::sleep(PROVISION_RETRY_DELAY);
        }
    }
    Err(last_error.unwrap_or_else(|| HarnessError::template("exhausted retries")))
}

fn migrate_schema(url: &str) -> Result<(), HarnessError> {
    let mut conn =
        PgConnection::establish(url).map_err(|err| HarnessError::migration(format!("{err:?}")))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| HarnessError::migration(format!("{err:?}")))?;
    Ok(())
}
