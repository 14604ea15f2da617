//! Lesson progress HTTP handlers.
//!
//! ```text
//! GET  /api/v1/lessons/{lessonId}/progress
//! POST /api/v1/lessons/{lessonId}/progress   {"watchTimeSeconds":570,"durationSeconds":600}
//! POST /api/v1/lessons/{lessonId}/completion
//! GET  /api/v1/progress
//! ```
//!
//! Player heartbeats may arrive several times a second; the command port
//! throttles them, so a throttled write is a normal `200` with
//! `outcome = "throttled"` rather than an error.

use actix_web::{get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::LessonProgress;
use crate::domain::ports::{
    MarkLessonCompletedRequest, ProgressUpdateResponse, RecordWatchSampleRequest,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::LearnerSession;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{parse_lesson_id, parse_watch_sample};

/// Player sample reported for a lesson.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchSampleBody {
    /// Playback position in whole seconds.
    pub watch_time_seconds: u32,
    /// Lesson duration in whole seconds, when the player knows it.
    pub duration_seconds: Option<u32>,
}

/// Stored progress for one lesson.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressBody {
    /// Lesson the progress belongs to.
    #[schema(format = "uuid")]
    pub lesson_id: String,
    /// Once true, never reverts.
    pub completed: bool,
    /// Furthest playback position seen, in whole seconds.
    pub watch_time_seconds: u32,
    /// When the lesson first completed.
    #[schema(value_type = Option<String>, format = "date-time")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Absent when no sample was ever stored.
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_watched_at: Option<DateTime<Utc>>,
}

impl From<LessonProgress> for LessonProgressBody {
    fn from(value: LessonProgress) -> Self {
        Self {
            lesson_id: value.lesson_id.to_string(),
            completed: value.completed,
            watch_time_seconds: value.watch_time_seconds,
            completed_at: value.completed_at,
            last_watched_at: Some(value.last_watched_at),
        }
    }
}

impl LessonProgressBody {
    fn untouched(lesson_id: String) -> Self {
        Self {
            lesson_id,
            completed: false,
            watch_time_seconds: 0,
            completed_at: None,
            last_watched_at: None,
        }
    }
}

/// Result of a progress write.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateBody {
    /// `persisted`, `throttled` or `suppressed`.
    #[schema(example = "persisted")]
    pub outcome: String,
    /// True exactly once, on the write that completed the lesson.
    pub completion_notice: bool,
    /// Store attempts spent, zero when the write never reached it.
    pub attempts: u32,
    /// Milliseconds until the lesson accepts another sample.
    pub retry_after_ms: Option<u64>,
    /// Stored progress after a persisted write.
    pub progress: Option<LessonProgressBody>,
}

impl From<ProgressUpdateResponse> for ProgressUpdateBody {
    fn from(value: ProgressUpdateResponse) -> Self {
        Self {
            outcome: value.outcome.as_str().to_owned(),
            completion_notice: value.completion_notice,
            attempts: value.attempts,
            retry_after_ms: value
                .retry_after
                .map(|wait| u64::try_from(wait.as_millis()).unwrap_or(u64::MAX)),
            progress: value.progress.map(LessonProgressBody::from),
        }
    }
}

/// Progress for one lesson; a lesson never watched reads as zero.
#[utoipa::path(
    get,
    path = "/api/v1/lessons/{lesson_id}/progress",
    params(("lesson_id" = String, Path, format = "uuid", description = "Lesson identifier")),
    responses(
        (status = 200, description = "Lesson progress", body = LessonProgressBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["progress"],
    operation_id = "getLessonProgress",
    security(("SessionCookie" = []))
)]
#[get("/lessons/{lesson_id}/progress")]
pub async fn get_lesson_progress(
    state: web::Data<HttpState>,
    session: LearnerSession,
    path: web::Path<String>,
) -> ApiResult<web::Json<LessonProgressBody>> {
    let user_id = session.require_learner()?;
    let raw = path.into_inner();
    let lesson_id = parse_lesson_id(&raw)?;

    let progress = state
        .progress_query
        .get_progress(&user_id, &lesson_id)
        .await?;
    Ok(web::Json(progress.map_or_else(
        || LessonProgressBody::untouched(lesson_id.to_string()),
        LessonProgressBody::from,
    )))
}

/// Record a player sample.
///
/// # Examples
/// ```no_run
/// use actix_web::web;
/// use academy::inbound::http::progress::{ProgressUpdateBody, WatchSampleBody, record_watch_sample};
/// use academy::inbound::http::session::LearnerSession;
/// use academy::inbound::http::{ApiResult, state::HttpState};
///
/// async fn call_handler(
///     state: web::Data<HttpState>,
///     session: LearnerSession,
/// ) -> ApiResult<web::Json<ProgressUpdateBody>> {
///     let path = web::Path::from("9b2f7c3e-8d41-4a55-a3c6-0f0e5d9a1b2c".to_owned());
///     let payload = web::Json(WatchSampleBody {
///         watch_time_seconds: 570,
///         duration_seconds: Some(600),
///     });
///     record_watch_sample(state, session, path, payload).await
/// }
/// ```
#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/progress",
    params(("lesson_id" = String, Path, format = "uuid", description = "Lesson identifier")),
    request_body = WatchSampleBody,
    responses(
        (status = 200, description = "Sample reconciled or throttled", body = ProgressUpdateBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["progress"],
    operation_id = "recordWatchSample",
    security(("SessionCookie" = []))
)]
#[post("/lessons/{lesson_id}/progress")]
pub async fn record_watch_sample(
    state: web::Data<HttpState>,
    session: LearnerSession,
    path: web::Path<String>,
    payload: web::Json<WatchSampleBody>,
) -> ApiResult<web::Json<ProgressUpdateBody>> {
    let user_id = session.require_learner()?;
    let lesson_id = parse_lesson_id(&path.into_inner())?;
    let WatchSampleBody {
        watch_time_seconds,
        duration_seconds,
    } = payload.into_inner();
    let sample = parse_watch_sample(watch_time_seconds, duration_seconds)?;

    let response = state
        .progress
        .record_watch_sample(RecordWatchSampleRequest {
            user_id,
            lesson_id,
            sample,
        })
        .await?;
    Ok(web::Json(ProgressUpdateBody::from(response)))
}

/// Mark a lesson as watched.
#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lesson_id}/completion",
    params(("lesson_id" = String, Path, format = "uuid", description = "Lesson identifier")),
    responses(
        (status = 200, description = "Lesson completed or throttled", body = ProgressUpdateBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["progress"],
    operation_id = "markLessonCompleted",
    security(("SessionCookie" = []))
)]
#[post("/lessons/{lesson_id}/completion")]
pub async fn mark_lesson_completed(
    state: web::Data<HttpState>,
    session: LearnerSession,
    path: web::Path<String>,
) -> ApiResult<web::Json<ProgressUpdateBody>> {
    let user_id = session.require_learner()?;
    let lesson_id = parse_lesson_id(&path.into_inner())?;

    let response = state
        .progress
        .mark_completed(MarkLessonCompletedRequest { user_id, lesson_id })
        .await?;
    Ok(web::Json(ProgressUpdateBody::from(response)))
}

/// Every lesson the learner has progress on, most recent first.
#[utoipa::path(
    get,
    path = "/api/v1/progress",
    responses(
        (status = 200, description = "Progress rows", body = [LessonProgressBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["progress"],
    operation_id = "listProgress",
    security(("SessionCookie" = []))
)]
#[get("/progress")]
pub async fn list_progress(
    state: web::Data<HttpState>,
    session: LearnerSession,
) -> ApiResult<web::Json<Vec<LessonProgressBody>>> {
    let user_id = session.require_learner()?;
    let rows = state.progress_query.list_progress(&user_id).await?;
    Ok(web::Json(
        rows.into_iter().map(LessonProgressBody::from).collect(),
    ))
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
