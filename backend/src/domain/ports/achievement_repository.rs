//! Port for achievement unlock records.

use async_trait::async_trait;

use crate::domain::UserId;
use crate::domain::gamification::StudentAchievement;

use super::define_port_error;

define_port_error! {
    /// Errors raised by achievement repository adapters.
    pub enum AchievementRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "achievement repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "achievement repository query failed: {message}",
    }
}

/// Port for listing and recording unlocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementRepository: Send + Sync {
    /// Unlocks recorded for a student.
    async fn list_unlocked(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<StudentAchievement>, AchievementRepositoryError>;

    /// Record an unlock; returns `false` when it already existed.
    async fn unlock(
        &self,
        achievement: &StudentAchievement,
    ) -> Result<bool, AchievementRepositoryError>;
}

/// Fixture implementation that never remembers unlocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAchievementRepository;

#[async_trait]
impl AchievementRepository for FixtureAchievementRepository {
    async fn list_unlocked(
        &self,
        _student_id: &UserId,
    ) -> Result<Vec<StudentAchievement>, AchievementRepositoryError> {
        Ok(Vec::new())
    }

    async fn unlock(
        &self,
        _achievement: &StudentAchievement,
    ) -> Result<bool, AchievementRepositoryError> {
        Ok(false)
    }
}
