//! Subscription management HTTP handlers.
//!
//! ```text
//! POST /api/v1/companies/{companyId}/subscription/sync
//! POST /api/v1/companies/{companyId}/subscription/cancel {"atPeriodEnd":true}
//! GET  /api/v1/billing/prices
//! ```

use actix_web::{get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::CancelSubscriptionRequest;
use crate::domain::{BillingInterval, BillingPrice, SubscriptionSnapshot, SubscriptionStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, SubscriptionStatusSchema};
use crate::inbound::http::session::LearnerSession;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_company_id;

/// Subscription state mirrored onto the company.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionBody {
    pub subscription_id: String,
    #[schema(value_type = SubscriptionStatusSchema)]
    pub status: SubscriptionStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

impl From<SubscriptionSnapshot> for SubscriptionBody {
    fn from(value: SubscriptionSnapshot) -> Self {
        Self {
            subscription_id: value.subscription_id,
            status: value.status,
            current_period_end: value.current_period_end,
            cancel_at_period_end: value.cancel_at_period_end,
        }
    }
}

/// Cancellation options.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelSubscriptionBody {
    /// Keep access until the paid period ends. Defaults to `true`.
    pub at_period_end: Option<bool>,
}

/// Purchasable price.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceBody {
    pub id: String,
    pub product_name: String,
    /// Amount in the currency's minor unit.
    pub unit_amount: i64,
    #[schema(example = "brl")]
    pub currency: String,
    /// `day`, `week`, `month` or `year`; absent for one-off prices.
    #[schema(value_type = Option<String>, example = "month")]
    pub interval: Option<BillingInterval>,
}

impl From<BillingPrice> for PriceBody {
    fn from(value: BillingPrice) -> Self {
        Self {
            id: value.id,
            product_name: value.product_name,
            unit_amount: value.unit_amount,
            currency: value.currency,
            interval: value.interval,
        }
    }
}

/// Refresh the company's subscription from the billing provider.
///
/// Any member of the company may trigger a refresh.
#[utoipa::path(
    post,
    path = "/api/v1/companies/{company_id}/subscription/sync",
    params(("company_id" = String, Path, format = "uuid", description = "Company identifier")),
    responses(
        (status = 200, description = "Subscription mirrored", body = SubscriptionBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Not a member of the company", body = ErrorSchema),
        (status = 404, description = "Company or subscription not found", body = ErrorSchema),
        (status = 503, description = "Billing provider unavailable", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "syncSubscription",
    security(("SessionCookie" = []))
)]
#[post("/companies/{company_id}/subscription/sync")]
pub async fn sync_subscription(
    state: web::Data<HttpState>,
    session: LearnerSession,
    path: web::Path<String>,
) -> ApiResult<web::Json<SubscriptionBody>> {
    let user_id = session.require_learner()?;
    let company_id = parse_company_id(&path.into_inner())?;

    let snapshot = state
        .subscriptions
        .sync_subscription(&company_id, &user_id)
        .await?;
    Ok(web::Json(SubscriptionBody::from(snapshot)))
}

/// Cancel the company's plan. Managers only.
#[utoipa::path(
    post,
    path = "/api/v1/companies/{company_id}/subscription/cancel",
    params(("company_id" = String, Path, format = "uuid", description = "Company identifier")),
    request_body(content = CancelSubscriptionBody, description = "Optional; defaults to cancelling at period end"),
    responses(
        (status = 200, description = "Cancellation mirrored", body = SubscriptionBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Not a manager of the company", body = ErrorSchema),
        (status = 404, description = "Company or subscription not found", body = ErrorSchema),
        (status = 503, description = "Billing provider unavailable", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "cancelSubscription",
    security(("SessionCookie" = []))
)]
#[post("/companies/{company_id}/subscription/cancel")]
pub async fn cancel_subscription(
    state: web::Data<HttpState>,
    session: LearnerSession,
    path: web::Path<String>,
    payload: Option<web::Json<CancelSubscriptionBody>>,
) -> ApiResult<web::Json<SubscriptionBody>> {
    let requested_by = session.require_learner()?;
    let company_id = parse_company_id(&path.into_inner())?;
    let at_period_end = payload
        .and_then(|body| body.into_inner().at_period_end)
        .unwrap_or(true);

    let snapshot = state
        .subscriptions
        .cancel_subscription(CancelSubscriptionRequest {
            company_id,
            requested_by,
            at_period_end,
        })
        .await?;
    Ok(web::Json(SubscriptionBody::from(snapshot)))
}

/// Prices available for purchase.
#[utoipa::path(
    get,
    path = "/api/v1/billing/prices",
    responses(
        (status = 200, description = "Active prices", body = [PriceBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 503, description = "Billing provider unavailable", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "listPrices",
    security(("SessionCookie" = []))
)]
#[get("/billing/prices")]
pub async fn list_prices(
    state: web::Data<HttpState>,
    session: LearnerSession,
) -> ApiResult<web::Json<Vec<PriceBody>>> {
    session.require_learner()?;
    let prices = state.subscriptions.list_prices().await?;
    Ok(web::Json(prices.into_iter().map(PriceBody::from).collect()))
}

#[cfg(test)]
#[path = "subscriptions_tests.rs"]
mod tests;
