//! Port for lesson progress persistence.

use async_trait::async_trait;

use crate::domain::{LessonProgress, ProgressKey, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by lesson progress repository adapters.
    pub enum LessonProgressRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "lesson progress repository connection failed: {message}",
        /// Row-level security or grants refused the write.
        PermissionDenied { message: String } =>
            "lesson progress write not permitted: {message}",
        /// A concurrent writer won a uniqueness race.
        Conflict { message: String } =>
            "lesson progress write conflicted: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "lesson progress repository query failed: {message}",
    }
    retryable: Connection;
}

/// Port for reading and upserting lesson progress rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LessonProgressRepository: Send + Sync {
    /// Find the progress row for a key.
    async fn find(
        &self,
        key: &ProgressKey,
    ) -> Result<Option<LessonProgress>, LessonProgressRepositoryError>;

    /// Upsert a merged row and return what the store holds afterwards.
    ///
    /// Adapters must apply the same merge on conflict (greatest watch time,
    /// sticky completion) so concurrent writers converge.
    async fn upsert(
        &self,
        progress: &LessonProgress,
    ) -> Result<LessonProgress, LessonProgressRepositoryError>;

    /// List every progress row for a user, most recently watched first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LessonProgress>, LessonProgressRepositoryError>;
}

/// Fixture implementation that stores nothing and echoes writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLessonProgressRepository;

#[async_trait]
impl LessonProgressRepository for FixtureLessonProgressRepository {
    async fn find(
        &self,
        _key: &ProgressKey,
    ) -> Result<Option<LessonProgress>, LessonProgressRepositoryError> {
        Ok(None)
    }

    async fn upsert(
        &self,
        progress: &LessonProgress,
    ) -> Result<LessonProgress, LessonProgressRepositoryError> {
        Ok(progress.clone())
    }

    async fn list_for_user(
        &self,
        _user_id: &UserId,
    ) -> Result<Vec<LessonProgress>, LessonProgressRepositoryError> {
        Ok(Vec::new())
    }
}
