//! Lesson watch-progress aggregate and its merge rules.
//!
//! Progress rows are upserted, never deleted. Watch time only ever grows and
//! completion is sticky, so out-of-order or repeated samples converge on the
//! same row regardless of arrival order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Largest watch time accepted from a player sample (seven days).
pub const MAX_WATCH_TIME_SECONDS: u32 = 604_800;

/// Default auto-completion threshold, in percent of the lesson duration.
pub const DEFAULT_COMPLETION_PERCENT: u8 = 95;

/// Validation errors for lesson identifiers and watch samples.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LessonProgressValidationError {
    /// Lesson id was not a UUID.
    #[error("lesson id must be a valid UUID")]
    InvalidLessonId,
    /// Watch time exceeded [`MAX_WATCH_TIME_SECONDS`].
    #[error("watch time must be at most {max} seconds")]
    WatchTimeTooLarge {
        /// Upper bound in seconds.
        max: u32,
    },
    /// Duration was zero.
    #[error("lesson duration must be positive")]
    ZeroDuration,
    /// Threshold was outside `1..=100`.
    #[error("completion threshold must be between 1 and 100 percent")]
    ThresholdOutOfRange,
}

/// Stable lesson identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(Uuid);

impl LessonId {
    /// Parse a lesson id from text.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, LessonProgressValidationError> {
        Uuid::parse_str(raw.as_ref())
            .map(Self)
            .map_err(|_| LessonProgressValidationError::InvalidLessonId)
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Composite key identifying one progress row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    /// Learner the row belongs to.
    pub user_id: UserId,
    /// Lesson being watched.
    pub lesson_id: LessonId,
}

impl ProgressKey {
    /// Build a key from its parts.
    pub fn new(user_id: UserId, lesson_id: LessonId) -> Self {
        Self { user_id, lesson_id }
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.lesson_id)
    }
}

/// One playback observation reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSample {
    watch_time_seconds: u32,
    duration_seconds: Option<u32>,
}

impl WatchSample {
    /// Validate a sample.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::WatchSample;
    ///
    /// let sample = WatchSample::new(120, Some(600)).expect("valid sample");
    /// assert_eq!(sample.watch_time_seconds(), 120);
    /// assert!(WatchSample::new(10, Some(0)).is_err());
    /// ```
    pub fn new(
        watch_time_seconds: u32,
        duration_seconds: Option<u32>,
    ) -> Result<Self, LessonProgressValidationError> {
        if watch_time_seconds > MAX_WATCH_TIME_SECONDS {
            return Err(LessonProgressValidationError::WatchTimeTooLarge {
                max: MAX_WATCH_TIME_SECONDS,
            });
        }
        if duration_seconds == Some(0) {
            return Err(LessonProgressValidationError::ZeroDuration);
        }
        Ok(Self {
            watch_time_seconds,
            duration_seconds,
        })
    }

    /// Observed watch time.
    pub fn watch_time_seconds(&self) -> u32 {
        self.watch_time_seconds
    }

    /// Lesson duration reported by the player, when known.
    pub fn duration_seconds(&self) -> Option<u32> {
        self.duration_seconds
    }
}

/// Percentage of the lesson duration after which a lesson auto-completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionThreshold(u8);

impl CompletionThreshold {
    /// Validate a percentage in `1..=100`.
    pub fn new(percent: u8) -> Result<Self, LessonProgressValidationError> {
        if percent == 0 || percent > 100 {
            return Err(LessonProgressValidationError::ThresholdOutOfRange);
        }
        Ok(Self(percent))
    }

    /// Threshold percentage.
    pub fn percent(self) -> u8 {
        self.0
    }

    /// Whether `watch / duration` reached the threshold.
    ///
    /// Integer arithmetic keeps the comparison exact.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::CompletionThreshold;
    ///
    /// let threshold = CompletionThreshold::default();
    /// assert!(threshold.is_reached(95, 100));
    /// assert!(!threshold.is_reached(94, 100));
    /// ```
    pub fn is_reached(self, watch_time_seconds: u32, duration_seconds: u32) -> bool {
        if duration_seconds == 0 {
            return false;
        }
        u64::from(watch_time_seconds) * 100 >= u64::from(duration_seconds) * u64::from(self.0)
    }
}

impl Default for CompletionThreshold {
    fn default() -> Self {
        Self(DEFAULT_COMPLETION_PERCENT)
    }
}

/// Persisted progress for one `(user, lesson)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    /// Learner the row belongs to.
    pub user_id: UserId,
    /// Lesson being tracked.
    pub lesson_id: LessonId,
    /// Sticky completion flag.
    pub completed: bool,
    /// Maximum watch time observed so far.
    pub watch_time_seconds: u32,
    /// First completion instant.
    pub completed_at: Option<DateTime<Utc>>,
    /// Last accepted sample instant.
    pub last_watched_at: DateTime<Utc>,
}

impl LessonProgress {
    /// Row key.
    pub fn key(&self) -> ProgressKey {
        ProgressKey::new(self.user_id.clone(), self.lesson_id)
    }

    /// Merge an incoming observation into the existing row.
    ///
    /// Watch time takes the maximum of both sides; completion never reverts
    /// and keeps its first timestamp.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use academy::domain::{LessonId, LessonProgress, ProgressKey, UserId};
    /// use uuid::Uuid;
    ///
    /// let key = ProgressKey::new(UserId::random(), LessonId::from_uuid(Uuid::new_v4()));
    /// let first = LessonProgress::merge(None, &key, 300, false, Utc::now());
    /// let second = LessonProgress::merge(Some(&first), &key, 120, false, Utc::now());
    /// assert_eq!(second.watch_time_seconds, 300);
    /// ```
    pub fn merge(
        existing: Option<&LessonProgress>,
        key: &ProgressKey,
        incoming_watch_time_seconds: u32,
        mark_completed: bool,
        now: DateTime<Utc>,
    ) -> LessonProgress {
        let previous_watch = existing.map_or(0, |row| row.watch_time_seconds);
        let previously_completed = existing.is_some_and(|row| row.completed);
        let completed = previously_completed || mark_completed;
        let completed_at = match existing.and_then(|row| row.completed_at) {
            Some(at) => Some(at),
            None if completed => Some(now),
            None => None,
        };

        LessonProgress {
            user_id: key.user_id.clone(),
            lesson_id: key.lesson_id,
            completed,
            watch_time_seconds: previous_watch.max(incoming_watch_time_seconds),
            completed_at,
            last_watched_at: now,
        }
    }

    /// Whether moving from `before` to `self` completes the lesson.
    pub fn completes_after(&self, before: Option<&LessonProgress>) -> bool {
        self.completed && !before.is_some_and(|row| row.completed)
    }
}
