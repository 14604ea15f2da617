//! Per-key write throttle for watch-progress samples.
//!
//! Players report progress every few seconds. The throttle admits at most one
//! write per `(user, lesson)` within the cool-down and never lets two writes
//! for the same key overlap. State is process-local; the database upsert
//! remains the source of truth.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::ProgressKey;

/// Default minimum spacing between accepted samples for one key.
pub const DEFAULT_PROGRESS_COOLDOWN: Duration = Duration::from_millis(2_500);

/// Timestamp entries kept before pruning kicks in.
const PRUNE_THRESHOLD: usize = 1_024;

#[derive(Debug, Default)]
struct ThrottleState {
    last_accepted: HashMap<ProgressKey, DateTime<Utc>>,
    in_flight: HashSet<ProgressKey>,
}

/// Outcome of asking the throttle for a write slot.
#[derive(Debug)]
pub enum ThrottleDecision {
    /// The caller owns the write slot until the permit is dropped.
    Admitted(ThrottlePermit),
    /// A write for this key was accepted too recently.
    CoolingDown {
        /// Time left until the key accepts another sample.
        retry_after: Duration,
    },
    /// Another write for this key has not finished yet.
    InFlight,
}

/// Write slot for one key; releases the in-flight marker on drop.
#[derive(Debug)]
pub struct ThrottlePermit {
    key: ProgressKey,
    state: Arc<Mutex<ThrottleState>>,
}

impl Drop for ThrottlePermit {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight.remove(&self.key);
    }
}

/// Cool-down and pending-update guard keyed by [`ProgressKey`].
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    cooldown: Duration,
    state: Arc<Mutex<ThrottleState>>,
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_COOLDOWN)
    }
}

impl ProgressThrottle {
    /// Build a throttle with the given cool-down.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            state: Arc::new(Mutex::new(ThrottleState::default())),
        }
    }

    /// Configured cool-down.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Ask for a write slot at `now`.
    ///
    /// `bypass_cooldown` skips the timing check for explicit user actions but
    /// still refuses overlapping writes.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::{LessonId, ProgressKey, ProgressThrottle, ThrottleDecision, UserId};
    /// use chrono::Utc;
    /// use uuid::Uuid;
    ///
    /// let throttle = ProgressThrottle::default();
    /// let key = ProgressKey::new(UserId::random(), LessonId::from_uuid(Uuid::new_v4()));
    /// let now = Utc::now();
    /// let permit = throttle.acquire(&key, now, false);
    /// assert!(matches!(permit, ThrottleDecision::Admitted(_)));
    /// drop(permit);
    /// assert!(matches!(
    ///     throttle.acquire(&key, now, false),
    ///     ThrottleDecision::CoolingDown { .. }
    /// ));
    /// ```
    pub fn acquire(
        &self,
        key: &ProgressKey,
        now: DateTime<Utc>,
        bypass_cooldown: bool,
    ) -> ThrottleDecision {
        let mut state = self.lock();

        if state.in_flight.contains(key) {
            return ThrottleDecision::InFlight;
        }

        if !bypass_cooldown
            && let Some(last) = state.last_accepted.get(key)
            && let Some(retry_after) = self.remaining(*last, now)
        {
            return ThrottleDecision::CoolingDown { retry_after };
        }

        if state.last_accepted.len() >= PRUNE_THRESHOLD {
            self.prune(&mut state, now);
        }
        state.last_accepted.insert(key.clone(), now);
        state.in_flight.insert(key.clone());

        ThrottleDecision::Admitted(ThrottlePermit {
            key: key.clone(),
            state: Arc::clone(&self.state),
        })
    }

    /// Number of keys with a remembered timestamp.
    pub fn tracked_keys(&self) -> usize {
        self.lock().last_accepted.len()
    }

    fn remaining(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
        let elapsed = now.signed_duration_since(last);
        let cooldown = TimeDelta::from_std(self.cooldown).unwrap_or(TimeDelta::MAX);
        if elapsed >= cooldown {
            return None;
        }
        // Clock skew can make `elapsed` negative; report the full cool-down then.
        let left = cooldown - elapsed.max(TimeDelta::zero());
        Some(left.to_std().unwrap_or(self.cooldown))
    }

    fn prune(&self, state: &mut ThrottleState, now: DateTime<Utc>) {
        state
            .last_accepted
            .retain(|_, last| self.remaining(*last, now).is_some());
    }

    fn lock(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
