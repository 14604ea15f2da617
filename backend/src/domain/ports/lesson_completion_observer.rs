//! Port notified when a learner completes a lesson for the first time.

use async_trait::async_trait;

use crate::domain::{Error, LessonId, UserId};

/// Reacts to first-time lesson completions.
///
/// The progress service calls this after the completing write landed. Failures
/// are logged by the caller and never undo the completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LessonCompletionObserver: Send + Sync {
    /// Handle a completion of `lesson_id` by `user_id`.
    async fn lesson_completed(&self, user_id: &UserId, lesson_id: &LessonId) -> Result<(), Error>;
}

/// Observer that ignores completions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLessonCompletionObserver;

#[async_trait]
impl LessonCompletionObserver for NoOpLessonCompletionObserver {
    async fn lesson_completed(
        &self,
        _user_id: &UserId,
        _lesson_id: &LessonId,
    ) -> Result<(), Error> {
        Ok(())
    }
}
