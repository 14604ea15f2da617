//! Tests for lesson progress HTTP handlers.

use super::*;
use crate::domain::ports::{
    FIXTURE_LOGIN_USER_ID, MockLessonProgressCommand, MockLessonProgressQuery, ProgressWriteOutcome,
};
use crate::domain::{Error, LessonId, UserId};
use crate::inbound::http::state::HttpStatePorts;
use crate::inbound::http::test_utils::{login_and_get_cookie, test_app};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use chrono::TimeZone;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const LESSON_ID: &str = "9b2f7c3e-8d41-4a55-a3c6-0f0e5d9a1b2c";

fn learner() -> UserId {
    UserId::new(FIXTURE_LOGIN_USER_ID).expect("fixture id")
}

fn lesson() -> LessonId {
    LessonId::new(LESSON_ID).expect("lesson id")
}

fn stored(watch: u32, completed: bool) -> LessonProgress {
    let at = Utc
        .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid time");
    LessonProgress {
        user_id: learner(),
        lesson_id: lesson(),
        completed,
        watch_time_seconds: watch,
        completed_at: completed.then_some(at),
        last_watched_at: at,
    }
}

fn state_with(command: MockLessonProgressCommand, query: MockLessonProgressQuery) -> HttpState {
    HttpState::new(HttpStatePorts {
        progress: Arc::new(command),
        progress_query: Arc::new(query),
        ..HttpStatePorts::default()
    })
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_lesson_progress)
        .service(record_watch_sample)
        .service(mark_lesson_completed)
        .service(list_progress);
}

#[actix_web::test]
async fn sample_is_forwarded_and_completion_notice_surfaces() {
    let mut command = MockLessonProgressCommand::new();
    command
        .expect_record_watch_sample()
        .withf(|request| {
            request.user_id == learner()
                && request.lesson_id == lesson()
                && request.sample.watch_time_seconds() == 570
                && request.sample.duration_seconds() == Some(600)
        })
        .times(1)
        .returning(|_| {
            Ok(ProgressUpdateResponse {
                outcome: ProgressWriteOutcome::Persisted,
                progress: Some(stored(570, true)),
                completion_notice: true,
                attempts: 1,
                retry_after: None,
            })
        });
    let app = actix_test::init_service(test_app(
        state_with(command, MockLessonProgressQuery::new()),
        configure,
    ))
    .await;
    let cookie = login_and_get_cookie(&app).await;

    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/lessons/{LESSON_ID}/progress"))
        .cookie(cookie)
        .set_json(json!({"watchTimeSeconds": 570, "durationSeconds": 600}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["outcome"], "persisted");
    assert_eq!(body["completionNotice"], true);
    assert_eq!(body["progress"]["completed"], true);
    assert_eq!(body["progress"]["watchTimeSeconds"], 570);
    assert_eq!(body["progress"]["lessonId"], LESSON_ID);
}

#[actix_web::test]
async fn throttled_samples_report_retry_after() {
    let mut command = MockLessonProgressCommand::new();
    command.expect_record_watch_sample().returning(|_| {
        Ok(ProgressUpdateResponse::throttled(Some(
            Duration::from_millis(1_200),
        )))
    });
    let app = actix_test::init_service(test_app(
        state_with(command, MockLessonProgressQuery::new()),
        configure,
    ))
    .await;
    let cookie = login_and_get_cookie(&app).await;

    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/lessons/{LESSON_ID}/progress"))
        .cookie(cookie)
        .set_json(json!({"watchTimeSeconds": 12}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["outcome"], "throttled");
    assert_eq!(body["retryAfterMs"], 1_200);
    assert_eq!(body["attempts"], 0);
    assert!(body["progress"].is_null());
}

#[rstest]
#[case(json!({"watchTimeSeconds": 700_000}), "watchTimeSeconds")]
#[case(json!({"watchTimeSeconds": 10, "durationSeconds": 0}), "durationSeconds")]
#[actix_web::test]
async fn invalid_samples_never_reach_the_port(#[case] payload: Value, #[case] field: &str) {
    let mut command = MockLessonProgressCommand::new();
    command.expect_record_watch_sample().never();
    let app = actix_test::init_service(test_app(
        state_with(command, MockLessonProgressQuery::new()),
        configure,
    ))
    .await;
    let cookie = login_and_get_cookie(&app).await;

    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/lessons/{LESSON_ID}/progress"))
        .cookie(cookie)
        .set_json(payload)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["field"], field);
}

#[actix_web::test]
async fn malformed_lesson_id_is_rejected() {
    let app = actix_test::init_service(test_app(
        state_with(
            MockLessonProgressCommand::new(),
            MockLessonProgressQuery::new(),
        ),
        configure,
    ))
    .await;
    let cookie = login_and_get_cookie(&app).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/lessons/intro/completion")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["field"], "lessonId");
    assert_eq!(body["details"]["code"], "invalid_uuid");
}

#[actix_web::test]
async fn completion_is_forwarded() {
    let mut command = MockLessonProgressCommand::new();
    command
        .expect_mark_completed()
        .withf(|request| request.lesson_id == lesson())
        .times(1)
        .returning(|_| {
            Ok(ProgressUpdateResponse {
                outcome: ProgressWriteOutcome::Persisted,
                progress: Some(stored(42, true)),
                completion_notice: true,
                attempts: 2,
                retry_after: None,
            })
        });
    let app = actix_test::init_service(test_app(
        state_with(command, MockLessonProgressQuery::new()),
        configure,
    ))
    .await;
    let cookie = login_and_get_cookie(&app).await;

    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/lessons/{LESSON_ID}/completion"))
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["attempts"], 2);
    assert_eq!(body["progress"]["completed"], true);
}

#[actix_web::test]
async fn unwatched_lessons_read_as_zero() {
    let mut query = MockLessonProgressQuery::new();
    query
        .expect_get_progress()
        .withf(|user_id, lesson_id| *user_id == learner() && *lesson_id == lesson())
        .returning(|_, _| Ok(None));
    let app = actix_test::init_service(test_app(
        state_with(MockLessonProgressCommand::new(), query),
        configure,
    ))
    .await;
    let cookie = login_and_get_cookie(&app).await;

    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/lessons/{LESSON_ID}/progress"))
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["watchTimeSeconds"], 0);
    assert_eq!(body["completed"], false);
    assert!(body["lastWatchedAt"].is_null());
}

#[actix_web::test]
async fn listing_maps_every_row() {
    let mut query = MockLessonProgressQuery::new();
    query
        .expect_list_progress()
        .returning(|_| Ok(vec![stored(300, false), stored(600, true)]));
    let app = actix_test::init_service(test_app(
        state_with(MockLessonProgressCommand::new(), query),
        configure,
    ))
    .await;
    let cookie = login_and_get_cookie(&app).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/progress")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    let rows = body.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["completedAt"], "2026-03-02T09:00:00Z");
}

#[actix_web::test]
async fn store_outages_surface_as_503() {
    let mut query = MockLessonProgressQuery::new();
    query.expect_list_progress().returning(|_| {
        Err(Error::service_unavailable(
            "lesson progress repository unavailable",
        ))
    });
    let app = actix_test::init_service(test_app(
        state_with(MockLessonProgressCommand::new(), query),
        configure,
    ))
    .await;
    let cookie = login_and_get_cookie(&app).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/progress")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body["userMessage"],
        "Serviço temporariamente indisponível. Tente novamente em instantes."
    );
}

#[actix_web::test]
async fn progress_requires_a_session() {
    let app = actix_test::init_service(test_app(
        state_with(
            MockLessonProgressCommand::new(),
            MockLessonProgressQuery::new(),
        ),
        configure,
    ))
    .await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/progress")
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
