//! Collaborator access gate handler.
//!
//! ```text
//! GET /api/v1/access
//! ```
//!
//! A denial is an answer, not a failure: the handler returns `200` with
//! `granted = false` and a reason so the client can show the right paywall.

use actix_web::{get, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{AccessDecision, AccessDenialReason, SubscriptionStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, SubscriptionStatusSchema};
use crate::inbound::http::session::LearnerSession;
use crate::inbound::http::state::HttpState;

/// Access decision for the current learner.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessBody {
    pub granted: bool,
    #[schema(format = "uuid")]
    pub company_id: Option<String>,
    #[schema(value_type = Option<SubscriptionStatusSchema>)]
    pub status: Option<SubscriptionStatus>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub expires_at: Option<DateTime<Utc>>,
    /// `no_company`, `no_subscription`, `inactive_subscription` or `expired`.
    #[schema(value_type = Option<String>, example = "expired")]
    pub reason: Option<AccessDenialReason>,
}

impl From<AccessDecision> for AccessBody {
    fn from(value: AccessDecision) -> Self {
        Self {
            granted: value.granted,
            company_id: value.company_id.map(|id| id.to_string()),
            status: value.status,
            expires_at: value.expires_at,
            reason: value.reason,
        }
    }
}

/// Whether the learner's company subscription lets them study.
#[utoipa::path(
    get,
    path = "/api/v1/access",
    responses(
        (status = 200, description = "Access decision", body = AccessBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "checkAccess",
    security(("SessionCookie" = []))
)]
#[get("/access")]
pub async fn check_access(
    state: web::Data<HttpState>,
    session: LearnerSession,
) -> ApiResult<web::Json<AccessBody>> {
    let user_id = session.require_learner()?;
    let decision = state.access.check_access(&user_id).await?;
    Ok(web::Json(AccessBody::from(decision)))
}
