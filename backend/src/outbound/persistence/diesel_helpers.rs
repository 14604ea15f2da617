//! Shared helpers for Diesel repository implementations.
//!
//! - Classifying Diesel and pool failures into [`UpstreamFailureKind`]
//! - Casting counters between domain `u32` and PostgreSQL `INTEGER`

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::{UpstreamFailureKind, classify_upstream_failure};

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// SQLSTATE implied by Diesel's error kind, where Diesel keeps one.
fn implied_sqlstate(kind: &DatabaseErrorKind) -> Option<&'static str> {
    match kind {
        DatabaseErrorKind::UniqueViolation => Some("23505"),
        DatabaseErrorKind::SerializationFailure => Some("40001"),
        DatabaseErrorKind::ClosedConnection => Some("08006"),
        _ => None,
    }
}

/// Classify a Diesel error and return a message safe to log.
///
/// Row-level security and grant failures surface from PostgreSQL as
/// `permission denied ...` or `... violates row-level security policy`
/// messages, which the classifier recognises.
pub fn classify_diesel_error(
    error: &DieselError,
    operation: &str,
) -> (UpstreamFailureKind, String) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            let message = info.message().to_owned();
            let failure = classify_upstream_failure(implied_sqlstate(kind), &message);
            debug!(?kind, ?failure, %message, %operation, "diesel operation failed");
            (failure, message)
        }
        DieselError::NotFound => (UpstreamFailureKind::Other, "record not found".to_owned()),
        DieselError::QueryBuilderError(_) => (
            UpstreamFailureKind::Other,
            "database query error".to_owned(),
        ),
        other => {
            debug!(
                error_type = %std::any::type_name_of_val(other),
                %operation,
                "diesel operation failed"
            );
            (UpstreamFailureKind::Other, "database error".to_owned())
        }
    }
}

/// Map a Diesel error onto a repository's connection/query constructors.
///
/// Transient failures become connection errors so the retry policy sees them;
/// everything else is a query error.
pub fn map_basic_diesel_error<E, Q, C>(
    error: &DieselError,
    operation: &str,
    query: Q,
    connection: C,
) -> E
where
    Q: FnOnce(String) -> E,
    C: FnOnce(String) -> E,
{
    match classify_diesel_error(error, operation) {
        (UpstreamFailureKind::Transient, message) => connection(message),
        (_, message) => query(message),
    }
}

/// Cast a domain counter to an `INTEGER` column, saturating at `i32::MAX`.
pub fn to_db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Cast an `INTEGER` column to a domain counter; check constraints keep it
/// non-negative.
pub fn from_db_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Cast a `COUNT(*)` result to a domain counter.
pub fn from_db_total(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
