//! Session-scoped latches that keep completion side effects single-shot.
//!
//! Auto-completion is armed once per user while they stay on the same lesson;
//! switching lessons re-arms it. Completion notices fire at most once per
//! `(user, lesson)` while the key stays active.
//!
//! Entries idle for longer than the TTL are dropped once the maps grow past
//! [`PRUNE_THRESHOLD`]. Losing a notice latch is harmless: completion is
//! sticky in the store, so a lesson completes for the first time only once.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::{LessonId, ProgressKey, UserId};

/// Idle time after which a latch may be forgotten; matches the session TTL.
pub const DEFAULT_GUARD_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Entries kept per map before pruning kicks in.
const PRUNE_THRESHOLD: usize = 1_024;

#[derive(Debug, Clone, Copy)]
struct PlaybackState {
    lesson_id: LessonId,
    auto_completed: bool,
    touched: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct GuardState {
    playback: HashMap<UserId, PlaybackState>,
    notified: HashMap<ProgressKey, DateTime<Utc>>,
}

/// Auto-completion and notification latches.
#[derive(Debug)]
pub struct CompletionGuard {
    ttl: TimeDelta,
    state: Mutex<GuardState>,
}

impl Default for CompletionGuard {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_GUARD_TTL)
    }
}

impl CompletionGuard {
    /// Create empty latches with the default idle TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty latches that forget entries idle for longer than `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            state: Mutex::new(GuardState::default()),
        }
    }

    /// Record that the user is watching `key.lesson_id` at `now`, re-arming
    /// auto-completion when the lesson changed.
    pub fn observe_lesson(&self, key: &ProgressKey, now: DateTime<Utc>) {
        let mut state = self.lock();
        if state.playback.len() >= PRUNE_THRESHOLD {
            self.prune_playback(&mut state, now);
        }
        let entry = state
            .playback
            .entry(key.user_id.clone())
            .or_insert(PlaybackState {
                lesson_id: key.lesson_id,
                auto_completed: false,
                touched: now,
            });
        if entry.lesson_id != key.lesson_id {
            entry.lesson_id = key.lesson_id;
            entry.auto_completed = false;
        }
        entry.touched = now;
    }

    /// Claim the auto-completion for the user's current lesson.
    ///
    /// Returns `false` when it was already claimed or the user moved on to a
    /// different lesson.
    pub fn claim_auto_completion(&self, key: &ProgressKey) -> bool {
        let mut state = self.lock();
        match state.playback.get_mut(&key.user_id) {
            Some(playback) if playback.lesson_id == key.lesson_id && !playback.auto_completed => {
                playback.auto_completed = true;
                true
            }
            _ => false,
        }
    }

    /// Give back an auto-completion claim whose write did not land.
    pub fn release_auto_completion(&self, key: &ProgressKey) {
        let mut state = self.lock();
        if let Some(playback) = state.playback.get_mut(&key.user_id)
            && playback.lesson_id == key.lesson_id
        {
            playback.auto_completed = false;
        }
    }

    /// Claim the completion notice for `key`; true only the first time.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::{CompletionGuard, LessonId, ProgressKey, UserId};
    /// use chrono::Utc;
    /// use uuid::Uuid;
    ///
    /// let guard = CompletionGuard::new();
    /// let key = ProgressKey::new(UserId::random(), LessonId::from_uuid(Uuid::new_v4()));
    /// let now = Utc::now();
    /// assert!(guard.claim_notice(&key, now));
    /// assert!(!guard.claim_notice(&key, now));
    /// ```
    pub fn claim_notice(&self, key: &ProgressKey, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        if state.notified.len() >= PRUNE_THRESHOLD {
            let ttl = self.ttl;
            state
                .notified
                .retain(|_, claimed| !Self::expired(ttl, *claimed, now));
        }
        state.notified.insert(key.clone(), now).is_none()
    }

    /// Number of users and keys currently latched.
    pub fn tracked_entries(&self) -> (usize, usize) {
        let state = self.lock();
        (state.playback.len(), state.notified.len())
    }

    fn prune_playback(&self, state: &mut GuardState, now: DateTime<Utc>) {
        let ttl = self.ttl;
        state
            .playback
            .retain(|_, playback| !Self::expired(ttl, playback.touched, now));
    }

    fn expired(ttl: TimeDelta, touched: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(touched) >= ttl
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
