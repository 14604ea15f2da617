//! Driving ports for lesson progress writes and reads.
//!
//! HTTP handlers call [`LessonProgressCommand`] with player samples and
//! explicit completions, and [`LessonProgressQuery`] to render progress.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Error, LessonId, LessonProgress, UserId, WatchSample};

/// Request carrying one player sample.
#[derive(Debug, Clone)]
pub struct RecordWatchSampleRequest {
    /// Learner reporting progress.
    pub user_id: UserId,
    /// Lesson being watched.
    pub lesson_id: LessonId,
    /// Validated playback observation.
    pub sample: WatchSample,
}

/// Request to mark a lesson as watched.
#[derive(Debug, Clone)]
pub struct MarkLessonCompletedRequest {
    /// Learner completing the lesson.
    pub user_id: UserId,
    /// Lesson being completed.
    pub lesson_id: LessonId,
}

/// What happened to a progress write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressWriteOutcome {
    /// The merged row was written.
    Persisted,
    /// Skipped by the cool-down or because a write for the key was in flight.
    Throttled,
    /// The store refused the write with a permission or conflict error.
    Suppressed,
}

impl ProgressWriteOutcome {
    /// Stable lowercase label used in logs and responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Persisted => "persisted",
            Self::Throttled => "throttled",
            Self::Suppressed => "suppressed",
        }
    }
}

/// Result of a progress write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdateResponse {
    /// Write outcome.
    pub outcome: ProgressWriteOutcome,
    /// Row after the write, when known.
    pub progress: Option<LessonProgress>,
    /// True exactly once per `(user, lesson)` when the lesson became completed.
    pub completion_notice: bool,
    /// Store attempts used; zero when throttled.
    pub attempts: u32,
    /// Time until the key accepts another sample, when throttled by cool-down.
    pub retry_after: Option<Duration>,
}

impl ProgressUpdateResponse {
    /// Response for a skipped write.
    pub fn throttled(retry_after: Option<Duration>) -> Self {
        Self {
            outcome: ProgressWriteOutcome::Throttled,
            progress: None,
            completion_notice: false,
            attempts: 0,
            retry_after,
        }
    }
}

/// Domain use-case port for progress writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LessonProgressCommand: Send + Sync {
    /// Reconcile a player sample into the stored progress.
    async fn record_watch_sample(
        &self,
        request: RecordWatchSampleRequest,
    ) -> Result<ProgressUpdateResponse, Error>;

    /// Mark a lesson completed regardless of watch time.
    async fn mark_completed(
        &self,
        request: MarkLessonCompletedRequest,
    ) -> Result<ProgressUpdateResponse, Error>;
}

/// Domain use-case port for progress reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LessonProgressQuery: Send + Sync {
    /// Progress for one lesson, if any sample was ever stored.
    async fn get_progress(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, Error>;

    /// All progress rows for a learner.
    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<LessonProgress>, Error>;
}

/// Fixture command that throttles every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLessonProgressCommand;

#[async_trait]
impl LessonProgressCommand for FixtureLessonProgressCommand {
    async fn record_watch_sample(
        &self,
        _request: RecordWatchSampleRequest,
    ) -> Result<ProgressUpdateResponse, Error> {
        Ok(ProgressUpdateResponse::throttled(None))
    }

    async fn mark_completed(
        &self,
        _request: MarkLessonCompletedRequest,
    ) -> Result<ProgressUpdateResponse, Error> {
        Ok(ProgressUpdateResponse::throttled(None))
    }
}

/// Fixture query with no stored progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLessonProgressQuery;

#[async_trait]
impl LessonProgressQuery for FixtureLessonProgressQuery {
    async fn get_progress(
        &self,
        _user_id: &UserId,
        _lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, Error> {
        Ok(None)
    }

    async fn list_progress(&self, _user_id: &UserId) -> Result<Vec<LessonProgress>, Error> {
        Ok(Vec::new())
    }
}
