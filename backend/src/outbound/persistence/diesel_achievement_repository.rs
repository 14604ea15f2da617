//! PostgreSQL-backed `AchievementRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::UserId;
use crate::domain::gamification::StudentAchievement;
use crate::domain::ports::{AchievementRepository, AchievementRepositoryError};

use super::diesel_helpers::{map_basic_diesel_error, map_pool_error_message};
use super::models::StudentAchievementRow;
use super::pool::{DbPool, PoolError};
use super::schema::student_achievements;

/// Diesel-backed implementation of the `AchievementRepository` port.
#[derive(Clone)]
pub struct DieselAchievementRepository {
    pool: DbPool,
}

impl DieselAchievementRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> AchievementRepositoryError {
    AchievementRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> AchievementRepositoryError {
    map_basic_diesel_error(
        &error,
        operation,
        AchievementRepositoryError::query,
        AchievementRepositoryError::connection,
    )
}

fn row_to_achievement(row: StudentAchievementRow) -> StudentAchievement {
    StudentAchievement {
        student_id: UserId::from_uuid(row.student_id),
        achievement_id: row.achievement_id,
        unlocked_at: row.unlocked_at,
    }
}

#[async_trait]
impl AchievementRepository for DieselAchievementRepository {
    async fn list_unlocked(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<StudentAchievement>, AchievementRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<StudentAchievementRow> = student_achievements::table
            .filter(student_achievements::student_id.eq(student_id.as_uuid()))
            .select(StudentAchievementRow::as_select())
            .order_by(student_achievements::unlocked_at.asc())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "student_achievements.list"))?;

        Ok(rows.into_iter().map(row_to_achievement).collect())
    }

    async fn unlock(
        &self,
        achievement: &StudentAchievement,
    ) -> Result<bool, AchievementRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = StudentAchievementRow {
            student_id: *achievement.student_id.as_uuid(),
            achievement_id: achievement.achievement_id.clone(),
            unlocked_at: achievement.unlocked_at,
        };

        let inserted = diesel::insert_into(student_achievements::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "student_achievements.unlock"))?;

        Ok(inserted > 0)
    }
}
