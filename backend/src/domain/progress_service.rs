//! Lesson progress reconciliation service.
//!
//! Turns a stream of player samples into at most one upsert per key per
//! cool-down, with capped retries for transient store failures and single-shot
//! completion side effects.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    LessonCompletionObserver, LessonProgressCommand, LessonProgressQuery, LessonProgressRepository,
    LessonProgressRepositoryError, MarkLessonCompletedRequest, NoOpLessonCompletionObserver,
    ProgressUpdateResponse, ProgressWriteOutcome, RecordWatchSampleRequest,
};
use crate::domain::{
    BackoffJitter, CompletionGuard, CompletionThreshold, DEFAULT_PROGRESS_COOLDOWN, Error,
    LessonId, LessonProgress, ProgressKey, ProgressThrottle, Retrier, RetryFailure, RetryPolicy,
    RetrySleeper, ThrottleDecision, UserId,
};

/// Tunables for progress reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonProgressConfig {
    /// Minimum spacing between accepted samples per `(user, lesson)`.
    pub cooldown: Duration,
    /// Auto-completion threshold.
    pub threshold: CompletionThreshold,
    /// Backoff for transient store failures.
    pub retry: RetryPolicy,
}

impl Default for LessonProgressConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_PROGRESS_COOLDOWN,
            threshold: CompletionThreshold::default(),
            retry: RetryPolicy::default(),
        }
    }
}

fn map_read_error(error: LessonProgressRepositoryError) -> Error {
    match error {
        LessonProgressRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("lesson progress repository unavailable: {message}"))
        }
        LessonProgressRepositoryError::PermissionDenied { message } => {
            Error::forbidden(format!("lesson progress not readable: {message}"))
        }
        LessonProgressRepositoryError::Conflict { message } => {
            Error::conflict(format!("lesson progress conflict: {message}"))
        }
        LessonProgressRepositoryError::Query { message } => {
            Error::internal(format!("lesson progress repository error: {message}"))
        }
    }
}

struct WriteIntent {
    watch_time_seconds: u32,
    mark_completed: bool,
    now: DateTime<Utc>,
}

/// Progress service implementing the progress driving ports.
#[derive(Clone)]
pub struct LessonProgressService<R> {
    progress_repo: Arc<R>,
    observer: Arc<dyn LessonCompletionObserver>,
    clock: Arc<dyn Clock>,
    throttle: ProgressThrottle,
    guard: Arc<CompletionGuard>,
    retrier: Retrier,
    threshold: CompletionThreshold,
}

impl<R> LessonProgressService<R> {
    /// Create a service with Tokio backoff and no completion observer.
    pub fn new(progress_repo: Arc<R>, clock: Arc<dyn Clock>, config: LessonProgressConfig) -> Self {
        let retrier = Retrier::new(config.retry, Arc::clone(&clock));
        Self::assemble(progress_repo, clock, config, retrier)
    }

    /// Create a service with injected backoff runtime.
    pub fn with_runtime(
        progress_repo: Arc<R>,
        clock: Arc<dyn Clock>,
        config: LessonProgressConfig,
        sleeper: Arc<dyn RetrySleeper>,
        jitter: Arc<dyn BackoffJitter>,
    ) -> Self {
        let retrier = Retrier::with_runtime(config.retry, Arc::clone(&clock), sleeper, jitter);
        Self::assemble(progress_repo, clock, config, retrier)
    }

    /// Notify `observer` about first-time completions.
    pub fn with_observer(mut self, observer: Arc<dyn LessonCompletionObserver>) -> Self {
        self.observer = observer;
        self
    }

    fn assemble(
        progress_repo: Arc<R>,
        clock: Arc<dyn Clock>,
        config: LessonProgressConfig,
        retrier: Retrier,
    ) -> Self {
        Self {
            progress_repo,
            observer: Arc::new(NoOpLessonCompletionObserver),
            clock,
            throttle: ProgressThrottle::new(config.cooldown),
            guard: Arc::new(CompletionGuard::new()),
            retrier,
            threshold: config.threshold,
        }
    }
}

impl<R> LessonProgressService<R>
where
    R: LessonProgressRepository,
{
    async fn write(
        &self,
        key: &ProgressKey,
        intent: WriteIntent,
    ) -> Result<ProgressUpdateResponse, Error> {
        let repo = &self.progress_repo;
        let WriteIntent {
            watch_time_seconds,
            mark_completed,
            now,
        } = intent;

        let result = self
            .retrier
            .run("lesson_progress.upsert", move || async move {
                let existing = repo.find(key).await?;
                let merged = LessonProgress::merge(
                    existing.as_ref(),
                    key,
                    watch_time_seconds,
                    mark_completed,
                    now,
                );
                let stored = repo.upsert(&merged).await?;
                Ok::<_, LessonProgressRepositoryError>((existing, stored))
            })
            .await;

        match result {
            Ok(attempted) => {
                let (before, stored) = attempted.value;
                let completion_notice =
                    stored.completes_after(before.as_ref()) && self.guard.claim_notice(key, now);
                if completion_notice {
                    self.notify_completion(key).await;
                }
                debug!(
                    %key,
                    watch_time_seconds = stored.watch_time_seconds,
                    completed = stored.completed,
                    attempts = attempted.attempts,
                    "lesson progress persisted"
                );
                Ok(ProgressUpdateResponse {
                    outcome: ProgressWriteOutcome::Persisted,
                    progress: Some(stored),
                    completion_notice,
                    attempts: attempted.attempts,
                    retry_after: None,
                })
            }
            Err(failure) => self.handle_failure(key, failure),
        }
    }

    fn handle_failure(
        &self,
        key: &ProgressKey,
        failure: RetryFailure<LessonProgressRepositoryError>,
    ) -> Result<ProgressUpdateResponse, Error> {
        let RetryFailure {
            error,
            attempts,
            exhausted,
        } = failure;
        match error {
            LessonProgressRepositoryError::PermissionDenied { .. }
            | LessonProgressRepositoryError::Conflict { .. } => {
                info!(%key, %error, "lesson progress write suppressed");
                Ok(ProgressUpdateResponse {
                    outcome: ProgressWriteOutcome::Suppressed,
                    progress: None,
                    completion_notice: false,
                    attempts,
                    retry_after: None,
                })
            }
            LessonProgressRepositoryError::Connection { message } => {
                warn!(%key, attempts, exhausted, %message, "lesson progress store unavailable");
                Err(Error::service_unavailable(format!(
                    "lesson progress repository unavailable after {attempts} attempts: {message}"
                )))
            }
            LessonProgressRepositoryError::Query { message } => Err(Error::internal(format!(
                "lesson progress repository error: {message}"
            ))),
        }
    }

    async fn notify_completion(&self, key: &ProgressKey) {
        if let Err(error) = self
            .observer
            .lesson_completed(&key.user_id, &key.lesson_id)
            .await
        {
            warn!(%key, error = %error, "lesson completion observer failed");
        }
    }
}

#[async_trait]
impl<R> LessonProgressCommand for LessonProgressService<R>
where
    R: LessonProgressRepository,
{
    async fn record_watch_sample(
        &self,
        request: RecordWatchSampleRequest,
    ) -> Result<ProgressUpdateResponse, Error> {
        let key = ProgressKey::new(request.user_id, request.lesson_id);
        let now = self.clock.utc();
        self.guard.observe_lesson(&key, now);

        let _permit = match self.throttle.acquire(&key, now, false) {
            ThrottleDecision::Admitted(permit) => permit,
            ThrottleDecision::CoolingDown { retry_after } => {
                debug!(%key, "progress sample inside cool-down");
                return Ok(ProgressUpdateResponse::throttled(Some(retry_after)));
            }
            ThrottleDecision::InFlight => {
                debug!(%key, "progress write already in flight");
                return Ok(ProgressUpdateResponse::throttled(None));
            }
        };

        let sample = request.sample;
        let reached = sample.duration_seconds().is_some_and(|duration| {
            self.threshold
                .is_reached(sample.watch_time_seconds(), duration)
        });
        let auto_complete = reached && self.guard.claim_auto_completion(&key);

        let result = self
            .write(
                &key,
                WriteIntent {
                    watch_time_seconds: sample.watch_time_seconds(),
                    mark_completed: auto_complete,
                    now,
                },
            )
            .await;

        let landed = matches!(
            &result,
            Ok(response) if response.outcome == ProgressWriteOutcome::Persisted
        );
        if auto_complete && !landed {
            self.guard.release_auto_completion(&key);
        }
        result
    }

    async fn mark_completed(
        &self,
        request: MarkLessonCompletedRequest,
    ) -> Result<ProgressUpdateResponse, Error> {
        let key = ProgressKey::new(request.user_id, request.lesson_id);
        let now = self.clock.utc();

        let _permit = match self.throttle.acquire(&key, now, true) {
            ThrottleDecision::Admitted(permit) => permit,
            ThrottleDecision::CoolingDown { retry_after } => {
                return Ok(ProgressUpdateResponse::throttled(Some(retry_after)));
            }
            ThrottleDecision::InFlight => return Ok(ProgressUpdateResponse::throttled(None)),
        };

        self.write(
            &key,
            WriteIntent {
                watch_time_seconds: 0,
                mark_completed: true,
                now,
            },
        )
        .await
    }
}

#[async_trait]
impl<R> LessonProgressQuery for LessonProgressService<R>
where
    R: LessonProgressRepository,
{
    async fn get_progress(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, Error> {
        let key = ProgressKey::new(user_id.clone(), *lesson_id);
        self.progress_repo.find(&key).await.map_err(map_read_error)
    }

    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<LessonProgress>, Error> {
        self.progress_repo
            .list_for_user(user_id)
            .await
            .map_err(map_read_error)
    }
}

#[cfg(test)]
#[path = "progress_service_tests.rs"]
mod tests;
