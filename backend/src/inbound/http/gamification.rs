//! Gamification HTTP handlers.
//!
//! ```text
//! GET  /api/v1/gamification/points
//! POST /api/v1/gamification/events {"kind":"quiz_passed"}
//! GET  /api/v1/gamification/achievements
//! ```

use actix_web::{get, post, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::StudentPoints;
use crate::domain::gamification::Achievement;
use crate::domain::ports::{AchievementStatus, AwardPointsRequest, AwardPointsResponse};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, PointEventKindSchema};
use crate::inbound::http::session::LearnerSession;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_reportable_event_kind;

/// Balance, level and streak.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PointsBody {
    pub points: u32,
    pub total_points: u32,
    pub level: u32,
    pub streak_days: u32,
    #[schema(value_type = Option<String>, format = "date")]
    pub last_activity_on: Option<NaiveDate>,
}

impl From<StudentPoints> for PointsBody {
    fn from(value: StudentPoints) -> Self {
        Self {
            points: value.points,
            total_points: value.total_points,
            level: value.level,
            streak_days: value.streak_days,
            last_activity_on: value.last_activity_on,
        }
    }
}

/// Activity reported by another part of the platform.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PointEventBody {
    #[schema(value_type = PointEventKindSchema, example = "quiz_passed")]
    pub kind: String,
}

/// Catalogue entry as shown to learners.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AchievementBody {
    #[schema(example = "first_lesson")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub reward_points: u32,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl AchievementBody {
    fn new(achievement: &Achievement, unlocked_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: achievement.id.to_owned(),
            name: achievement.name.to_owned(),
            description: achievement.description.to_owned(),
            reward_points: achievement.reward_points,
            unlocked_at,
        }
    }
}

impl From<AchievementStatus> for AchievementBody {
    fn from(value: AchievementStatus) -> Self {
        Self::new(value.achievement, value.unlocked_at)
    }
}

/// Outcome of a reported event.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwardBody {
    pub points_awarded: u32,
    /// True when today's cap for this kind was already reached.
    pub capped: bool,
    pub streak_bonus: u32,
    pub balance: PointsBody,
    /// Achievements unlocked by this event; `unlockedAt` is omitted.
    pub unlocked: Vec<AchievementBody>,
}

impl From<AwardPointsResponse> for AwardBody {
    fn from(value: AwardPointsResponse) -> Self {
        Self {
            points_awarded: value.points_awarded,
            capped: value.capped,
            streak_bonus: value.streak_bonus,
            balance: PointsBody::from(value.balance),
            unlocked: value
                .unlocked
                .into_iter()
                .map(|achievement| AchievementBody::new(achievement, None))
                .collect(),
        }
    }
}

/// Current balance; learners without activity read as level one.
#[utoipa::path(
    get,
    path = "/api/v1/gamification/points",
    responses(
        (status = 200, description = "Point balance", body = PointsBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["gamification"],
    operation_id = "getPoints",
    security(("SessionCookie" = []))
)]
#[get("/gamification/points")]
pub async fn get_points(
    state: web::Data<HttpState>,
    session: LearnerSession,
) -> ApiResult<web::Json<PointsBody>> {
    let user_id = session.require_learner()?;
    let points = state.gamification_query.get_points(&user_id).await?;
    Ok(web::Json(PointsBody::from(points)))
}

/// Award points for an activity.
///
/// `lesson_completed` is credited by the progress endpoints and `streak` is
/// derived from daily activity, so neither is accepted here.
#[utoipa::path(
    post,
    path = "/api/v1/gamification/events",
    request_body = PointEventBody,
    responses(
        (status = 200, description = "Points awarded", body = AwardBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["gamification"],
    operation_id = "reportPointEvent",
    security(("SessionCookie" = []))
)]
#[post("/gamification/events")]
pub async fn report_event(
    state: web::Data<HttpState>,
    session: LearnerSession,
    payload: web::Json<PointEventBody>,
) -> ApiResult<web::Json<AwardBody>> {
    let student_id = session.require_learner()?;
    let kind = parse_reportable_event_kind(&payload.kind)?;

    let response = state
        .gamification
        .award_points(AwardPointsRequest { student_id, kind })
        .await?;
    Ok(web::Json(AwardBody::from(response)))
}

/// Whole achievement catalogue with the learner's unlock state.
#[utoipa::path(
    get,
    path = "/api/v1/gamification/achievements",
    responses(
        (status = 200, description = "Achievements", body = [AchievementBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["gamification"],
    operation_id = "listAchievements",
    security(("SessionCookie" = []))
)]
#[get("/gamification/achievements")]
pub async fn list_achievements(
    state: web::Data<HttpState>,
    session: LearnerSession,
) -> ApiResult<web::Json<Vec<AchievementBody>>> {
    let user_id = session.require_learner()?;
    let statuses = state.gamification_query.list_achievements(&user_id).await?;
    Ok(web::Json(
        statuses.into_iter().map(AchievementBody::from).collect(),
    ))
}

#[cfg(test)]
#[path = "gamification_tests.rs"]
mod tests;
