//! Domain primitives, aggregates and services.
//!
//! Purpose: Define strongly typed learning-platform entities and the services
//! that reconcile lesson progress, award points and gate collaborator access.
//! Types keep their invariants in constructors and document serialisation
//! contracts (serde) in each type's Rustdoc.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - LessonProgress — per-user, per-lesson watch state.
//! - LessonProgressService — throttled, retried progress writes.
//! - GamificationService — points, streaks and achievements.
//! - SubscriptionService — access gate and plan management.

pub mod auth;
pub mod company;
pub mod completion_guard;
pub mod error;
pub mod error_translation;
pub mod gamification;
pub mod lesson_progress;
pub mod ports;
pub mod progress_service;
pub mod progress_throttle;
pub mod retry;
pub mod subscription;
pub mod subscription_service;
pub mod trace_id;
pub mod user;

pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::company::{
    Cnpj, Company, CompanyId, CompanyMembership, CompanyRole, CompanyValidationError,
};
pub use self::completion_guard::CompletionGuard;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::error_translation::{
    UpstreamFailureKind, classify_upstream_failure, translate_upstream_message,
};
pub use self::gamification::{GamificationService, PointEventKind, StudentPoints};
pub use self::lesson_progress::{
    CompletionThreshold, DEFAULT_COMPLETION_PERCENT, LessonId, LessonProgress,
    LessonProgressValidationError, MAX_WATCH_TIME_SECONDS, ProgressKey, WatchSample,
};
pub use self::progress_service::{LessonProgressConfig, LessonProgressService};
pub use self::progress_throttle::{
    DEFAULT_PROGRESS_COOLDOWN, ProgressThrottle, ThrottleDecision, ThrottlePermit,
};
pub use self::retry::{
    AttemptJitter, Attempted, BackoffJitter, Retrier, RetryFailure, RetryPolicy, RetrySleeper,
    Retryable, TokioSleeper,
};
pub use self::subscription::{
    AccessDecision, AccessDenialReason, BillingInterval, BillingPrice, SubscriptionSnapshot,
    SubscriptionStatus, UnknownSubscriptionStatus, has_collaborator_access,
};
pub use self::subscription_service::SubscriptionService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{UserId, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use academy::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
