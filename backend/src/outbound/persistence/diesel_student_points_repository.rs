//! PostgreSQL-backed `StudentPointsRepository` implementation using Diesel ORM.
//!
//! Balances live in `student_points`; every award also appends to the
//! `point_events` ledger, which daily caps and achievement criteria count.
//! Awards lock the balance row with `SELECT ... FOR UPDATE`, so concurrent
//! credits for one student are applied one after the other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::UserId;
use crate::domain::gamification::{
    AppliedAward, PointEvent, PointEventKind, PointsAward, StudentPoints, level_for_points,
};
use crate::domain::ports::{StudentPointsRepository, StudentPointsRepositoryError};

use super::diesel_helpers::{
    from_db_count, from_db_total, map_basic_diesel_error, map_pool_error_message, to_db_count,
};
use super::models::{NewPointEventRow, NewStudentPointsRow, StudentPointsRow, StudentPointsUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::{point_events, student_points};

/// Diesel-backed implementation of the `StudentPointsRepository` port.
#[derive(Clone)]
pub struct DieselStudentPointsRepository {
    pool: DbPool,
}

impl DieselStudentPointsRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> StudentPointsRepositoryError {
    StudentPointsRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> StudentPointsRepositoryError {
    map_basic_diesel_error(
        &error,
        operation,
        StudentPointsRepositoryError::query,
        StudentPointsRepositoryError::connection,
    )
}

fn row_to_points(row: StudentPointsRow) -> StudentPoints {
    let total_points = from_db_count(row.total_points);
    StudentPoints {
        student_id: UserId::from_uuid(row.student_id),
        points: from_db_count(row.points),
        total_points,
        // Recomputed so a threshold change never leaves stale levels behind.
        level: level_for_points(total_points),
        streak_days: from_db_count(row.streak_days),
        last_activity_on: row.last_activity_on,
    }
}

fn zero_row(student_id: &UserId, now: DateTime<Utc>) -> NewStudentPointsRow {
    let empty = StudentPoints::empty(student_id.clone());
    NewStudentPointsRow {
        student_id: *student_id.as_uuid(),
        points: 0,
        total_points: 0,
        level: to_db_count(empty.level),
        streak_days: 0,
        last_activity_on: None,
        updated_at: now,
    }
}

fn balance_update(points: &StudentPoints, now: DateTime<Utc>) -> StudentPointsUpdate {
    StudentPointsUpdate {
        points: to_db_count(points.points),
        total_points: to_db_count(points.total_points),
        level: to_db_count(points.level),
        streak_days: to_db_count(points.streak_days),
        last_activity_on: points.last_activity_on,
        updated_at: now,
    }
}

fn event_row(event: &PointEvent) -> NewPointEventRow<'static> {
    NewPointEventRow {
        id: event.id,
        student_id: *event.student_id.as_uuid(),
        kind: event.kind.as_str(),
        points: to_db_count(event.points),
        occurred_at: event.occurred_at,
    }
}

#[async_trait]
impl StudentPointsRepository for DieselStudentPointsRepository {
    async fn find(
        &self,
        student_id: &UserId,
    ) -> Result<Option<StudentPoints>, StudentPointsRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<StudentPointsRow> = student_points::table
            .filter(student_points::student_id.eq(student_id.as_uuid()))
            .select(StudentPointsRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "student_points.find"))?;

        Ok(row.map(row_to_points))
    }

    async fn apply_award(
        &self,
        award: &PointsAward,
    ) -> Result<AppliedAward, StudentPointsRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let student_uuid = *award.student_id.as_uuid();
        let now = award.occurred_at;
        let seed = zero_row(&award.student_id, now);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::insert_into(student_points::table)
                    .values(&seed)
                    .on_conflict(student_points::student_id)
                    .do_nothing()
                    .execute(conn)
                    .await?;

                let row: StudentPointsRow = student_points::table
                    .filter(student_points::student_id.eq(student_uuid))
                    .select(StudentPointsRow::as_select())
                    .for_update()
                    .first(conn)
                    .await?;

                let applied = row_to_points(row).apply(award);

                diesel::update(student_points::table)
                    .filter(student_points::student_id.eq(student_uuid))
                    .set(&balance_update(&applied.balance, now))
                    .execute(conn)
                    .await?;

                if !applied.ledger.is_empty() {
                    let event_rows: Vec<NewPointEventRow<'static>> =
                        applied.ledger.iter().map(event_row).collect();
                    diesel::insert_into(point_events::table)
                        .values(&event_rows)
                        .execute(conn)
                        .await?;
                }

                Ok::<AppliedAward, diesel::result::Error>(applied)
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_diesel_error(err, "student_points.apply_award"))
    }

    async fn count_events_since(
        &self,
        student_id: &UserId,
        kind: PointEventKind,
        since: DateTime<Utc>,
    ) -> Result<u32, StudentPointsRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let total: i64 = point_events::table
            .filter(point_events::student_id.eq(student_id.as_uuid()))
            .filter(point_events::kind.eq(kind.as_str()))
            .filter(point_events::occurred_at.ge(since))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "point_events.count_since"))?;

        Ok(from_db_total(total))
    }

    async fn count_events(
        &self,
        student_id: &UserId,
        kind: PointEventKind,
    ) -> Result<u32, StudentPointsRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let total: i64 = point_events::table
            .filter(point_events::student_id.eq(student_id.as_uuid()))
            .filter(point_events::kind.eq(kind.as_str()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "point_events.count"))?;

        Ok(from_db_total(total))
    }
}
