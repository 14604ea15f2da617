//! Tests for subscription management HTTP handlers.

use super::*;
use crate::domain::ports::{FIXTURE_LOGIN_USER_ID, MockSubscriptionCommand};
use crate::domain::{CompanyId, Error, UserId};
use crate::inbound::http::state::HttpStatePorts;
use crate::inbound::http::test_utils::{login_and_get_cookie, test_app};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use chrono::TimeZone;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;

const COMPANY_ID: &str = "5d0c1f7a-2b8e-4c3d-9f6a-7e1b2c3d4e5f";

fn learner() -> UserId {
    UserId::new(FIXTURE_LOGIN_USER_ID).expect("fixture id")
}

fn company() -> CompanyId {
    CompanyId::new(COMPANY_ID).expect("company id")
}

fn snapshot(status: SubscriptionStatus, cancel_at_period_end: bool) -> SubscriptionSnapshot {
    SubscriptionSnapshot {
        subscription_id: "sub_123".to_owned(),
        status,
        current_period_end: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).single(),
        cancel_at_period_end,
    }
}

fn state_with(command: MockSubscriptionCommand) -> HttpState {
    HttpState::new(HttpStatePorts {
        subscriptions: Arc::new(command),
        ..HttpStatePorts::default()
    })
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(sync_subscription)
        .service(cancel_subscription)
        .service(list_prices);
}

async fn send(
    command: MockSubscriptionCommand,
    request: actix_test::TestRequest,
) -> (StatusCode, Value) {
    let app = actix_test::init_service(test_app(state_with(command), configure)).await;
    let cookie = login_and_get_cookie(&app).await;
    let response = actix_test::call_service(&app, request.cookie(cookie).to_request()).await;
    let status = response.status();
    (status, actix_test::read_body_json(response).await)
}

#[actix_web::test]
async fn sync_mirrors_the_provider_snapshot() {
    let mut command = MockSubscriptionCommand::new();
    command
        .expect_sync_subscription()
        .withf(|company_id, requested_by| *company_id == company() && *requested_by == learner())
        .times(1)
        .returning(|_, _| Ok(snapshot(SubscriptionStatus::Active, false)));

    let (status, body) = send(
        command,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/companies/{COMPANY_ID}/subscription/sync")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["subscriptionId"], "sub_123");
    assert_eq!(body["currentPeriodEnd"], "2026-04-01T00:00:00Z");
}

#[rstest]
#[case(None, true)]
#[case(Some(json!({"atPeriodEnd": false})), false)]
#[case(Some(json!({})), true)]
#[actix_web::test]
async fn cancel_defaults_to_period_end(#[case] payload: Option<Value>, #[case] expected: bool) {
    let mut command = MockSubscriptionCommand::new();
    command
        .expect_cancel_subscription()
        .withf(move |request| {
            request.company_id == company()
                && request.requested_by == learner()
                && request.at_period_end == expected
        })
        .times(1)
        .returning(move |_| Ok(snapshot(SubscriptionStatus::Active, expected)));

    let mut request = actix_test::TestRequest::post().uri(&format!(
        "/api/v1/companies/{COMPANY_ID}/subscription/cancel"
    ));
    if let Some(payload) = payload {
        request = request.set_json(payload);
    }
    let (status, body) = send(command, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelAtPeriodEnd"], expected);
}

#[actix_web::test]
async fn collaborators_cannot_cancel() {
    let mut command = MockSubscriptionCommand::new();
    command.expect_cancel_subscription().returning(|_| {
        Err(Error::forbidden(
            "only company managers can change the plan",
        ))
    });

    let (status, body) = send(
        command,
        actix_test::TestRequest::post().uri(&format!(
            "/api/v1/companies/{COMPANY_ID}/subscription/cancel"
        )),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["userMessage"],
        "Apenas gestores da empresa podem alterar o plano."
    );
}

#[actix_web::test]
async fn malformed_company_id_is_rejected() {
    let mut command = MockSubscriptionCommand::new();
    command.expect_sync_subscription().never();

    let (status, body) = send(
        command,
        actix_test::TestRequest::post().uri("/api/v1/companies/acme/subscription/sync"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "companyId");
}

#[actix_web::test]
async fn provider_outage_is_503_with_translation() {
    let mut command = MockSubscriptionCommand::new();
    command.expect_list_prices().returning(|| {
        Err(Error::service_unavailable(
            "billing provider unavailable after 3 attempts: status 503",
        ))
    });

    let (status, body) = send(
        command,
        actix_test::TestRequest::get().uri("/api/v1/billing/prices"),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body["userMessage"],
        "O serviço de pagamentos está indisponível. Tente novamente em instantes."
    );
}

#[actix_web::test]
async fn prices_are_listed() {
    let mut command = MockSubscriptionCommand::new();
    command.expect_list_prices().returning(|| {
        Ok(vec![BillingPrice {
            id: "price_monthly".to_owned(),
            product_name: "Plano Empresa".to_owned(),
            unit_amount: 19_900,
            currency: "brl".to_owned(),
            interval: Some(BillingInterval::Month),
        }])
    });

    let (status, body) = send(
        command,
        actix_test::TestRequest::get().uri("/api/v1/billing/prices"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["productName"], "Plano Empresa");
    assert_eq!(body[0]["unitAmount"], 19_900);
    assert_eq!(body[0]["interval"], "month");
}
