//! PostgreSQL-backed `LessonProgressRepository` implementation using Diesel ORM.
//!
//! The upsert repeats the domain merge inside `ON CONFLICT` so concurrent
//! writers converge: the greatest watch time wins and completion is sticky.

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Int4, Nullable, Timestamptz};
use diesel_async::RunQueryDsl;

use crate::domain::ports::{LessonProgressRepository, LessonProgressRepositoryError};
use crate::domain::{LessonId, LessonProgress, ProgressKey, UpstreamFailureKind, UserId};

use super::diesel_helpers::{
    classify_diesel_error, from_db_count, map_pool_error_message, to_db_count,
};
use super::models::LessonProgressRow;
use super::pool::{DbPool, PoolError};
use super::schema::lesson_progress;

/// Diesel-backed implementation of the `LessonProgressRepository` port.
#[derive(Clone)]
pub struct DieselLessonProgressRepository {
    pool: DbPool,
}

impl DieselLessonProgressRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> LessonProgressRepositoryError {
    LessonProgressRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(
    error: diesel::result::Error,
    operation: &str,
) -> LessonProgressRepositoryError {
    let (kind, message) = classify_diesel_error(&error, operation);
    match kind {
        UpstreamFailureKind::PermissionDenied => {
            LessonProgressRepositoryError::permission_denied(message)
        }
        UpstreamFailureKind::Conflict => LessonProgressRepositoryError::conflict(message),
        UpstreamFailureKind::Transient => LessonProgressRepositoryError::connection(message),
        UpstreamFailureKind::Other => LessonProgressRepositoryError::query(message),
    }
}

fn row_to_progress(row: LessonProgressRow) -> LessonProgress {
    LessonProgress {
        user_id: UserId::from_uuid(row.user_id),
        lesson_id: LessonId::from_uuid(row.lesson_id),
        completed: row.completed,
        watch_time_seconds: from_db_count(row.watch_time_seconds),
        completed_at: row.completed_at,
        last_watched_at: row.last_watched_at,
    }
}

fn progress_to_row(progress: &LessonProgress) -> LessonProgressRow {
    LessonProgressRow {
        user_id: *progress.user_id.as_uuid(),
        lesson_id: *progress.lesson_id.as_uuid(),
        completed: progress.completed,
        watch_time_seconds: to_db_count(progress.watch_time_seconds),
        completed_at: progress.completed_at,
        last_watched_at: progress.last_watched_at,
    }
}

#[async_trait]
impl LessonProgressRepository for DieselLessonProgressRepository {
    async fn find(
        &self,
        key: &ProgressKey,
    ) -> Result<Option<LessonProgress>, LessonProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<LessonProgressRow> = lesson_progress::table
            .filter(lesson_progress::user_id.eq(key.user_id.as_uuid()))
            .filter(lesson_progress::lesson_id.eq(key.lesson_id.as_uuid()))
            .select(LessonProgressRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "lesson_progress.find"))?;

        Ok(row.map(row_to_progress))
    }

    async fn upsert(
        &self,
        progress: &LessonProgress,
    ) -> Result<LessonProgress, LessonProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = progress_to_row(progress);

        let stored: LessonProgressRow = diesel::insert_into(lesson_progress::table)
            .values(&row)
            .on_conflict((lesson_progress::user_id, lesson_progress::lesson_id))
            .do_update()
            .set((
                lesson_progress::watch_time_seconds.eq(sql::<Int4>(
                    "GREATEST(lesson_progress.watch_time_seconds, EXCLUDED.watch_time_seconds)",
                )),
                lesson_progress::completed.eq(sql::<Bool>(
                    "lesson_progress.completed OR EXCLUDED.completed",
                )),
                lesson_progress::completed_at.eq(sql::<Nullable<Timestamptz>>(
                    "COALESCE(lesson_progress.completed_at, EXCLUDED.completed_at)",
                )),
                lesson_progress::last_watched_at.eq(sql::<Timestamptz>(
                    "GREATEST(lesson_progress.last_watched_at, EXCLUDED.last_watched_at)",
                )),
            ))
            .returning(LessonProgressRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "lesson_progress.upsert"))?;

        Ok(row_to_progress(stored))
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LessonProgress>, LessonProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<LessonProgressRow> = lesson_progress::table
            .filter(lesson_progress::user_id.eq(user_id.as_uuid()))
            .select(LessonProgressRow::as_select())
            .order_by(lesson_progress::last_watched_at.desc())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "lesson_progress.list_for_user"))?;

        Ok(rows.into_iter().map(row_to_progress).collect())
    }
}
