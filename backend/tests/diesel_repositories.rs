//! Integration tests for the Diesel adapters against embedded PostgreSQL.
//!
//! These cover what mocks cannot: the `ON CONFLICT` merge for lesson
//! progress, row locking on point awards and idempotent unlocks.

use academy::domain::gamification::{
    PointEvent, PointsAward, StudentAchievement, points_for_event,
};
use academy::domain::ports::{
    AchievementRepository, CompanyRepository, CompanyRepositoryError, LessonProgressRepository,
    StudentPointsRepository,
};
use academy::domain::{
    CompanyId, CompanyRole, LessonId, LessonProgress, PointEventKind, ProgressKey,
    SubscriptionSnapshot, SubscriptionStatus, UserId,
};
use academy::outbound::persistence::{
    DbPool, DieselAchievementRepository, DieselCompanyRepository, DieselLessonProgressRepository,
    DieselStudentPointsRepository, PoolConfig,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use postgres::{Client, NoTls};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;
use uuid::Uuid;

mod support;

use support::atexit_cleanup::shared_cluster_handle;
use support::{format_postgres_error, handle_cluster_setup_failure, provision_template_database};

struct TestContext {
    runtime: Runtime,
    pool: DbPool,
    database_url: String,
    _database: TemporaryDatabase,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster_handle().map_err(|err| err.to_string())?;
    let database = provision_template_database(cluster).map_err(|err| err.to_string())?;
    let database_url = database.url().to_string();

    let config = PoolConfig::new(database_url.as_str())
        .with_max_size(4)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        pool,
        database_url,
        _database: database,
    })
}

#[fixture]
fn db() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn seed_company(url: &str, user_id: &UserId, role: &str) -> Result<CompanyId, String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let company_id = Uuid::new_v4();
    client
        .execute(
            "INSERT INTO companies (id, name) VALUES ($1, 'Acme Treinamentos')",
            &[&company_id],
        )
        .map_err(|err| format_postgres_error(&err))?;
    client
        .execute(
            "INSERT INTO company_users (company_id, user_id, role) VALUES ($1, $2, $3)",
            &[&company_id, user_id.as_uuid(), &role],
        )
        .map_err(|err| format_postgres_error(&err))?;
    Ok(CompanyId::from_uuid(company_id))
}

fn sample(
    user_id: &UserId,
    lesson_id: LessonId,
    watch: u32,
    completed_at: Option<DateTime<Utc>>,
    watched_at: DateTime<Utc>,
) -> LessonProgress {
    LessonProgress {
        user_id: user_id.clone(),
        lesson_id,
        completed: completed_at.is_some(),
        watch_time_seconds: watch,
        completed_at,
        last_watched_at: watched_at,
    }
}

fn event_award(student_id: &UserId, kind: PointEventKind, now: DateTime<Utc>) -> PointsAward {
    PointsAward {
        student_id: student_id.clone(),
        event: Some(PointEvent {
            id: Uuid::new_v4(),
            student_id: student_id.clone(),
            kind,
            points: points_for_event(kind, None),
            occurred_at: now,
        }),
        reward: 0,
        activity_on: Some(now.date_naive()),
        occurred_at: now,
    }
}

#[rstest]
fn progress_upsert_keeps_max_watch_time_and_sticky_completion(db: Option<TestContext>) {
    let Some(ctx) = db else {
        eprintln!(
            "SKIP-TEST-CLUSTER: progress_upsert_keeps_max_watch_time_and_sticky_completion skipped"
        );
        return;
    };
    let repository = DieselLessonProgressRepository::new(ctx.pool.clone());
    let user_id = UserId::random();
    let lesson_id = LessonId::from_uuid(Uuid::new_v4());

    let stored = ctx.runtime.block_on(async {
        repository
            .upsert(&sample(&user_id, lesson_id, 540, Some(at(9, 0)), at(9, 0)))
            .await
            .expect("first upsert");
        repository
            .upsert(&sample(&user_id, lesson_id, 120, None, at(9, 30)))
            .await
            .expect("stale upsert")
    });

    assert_eq!(stored.watch_time_seconds, 540);
    assert!(stored.completed);
    assert_eq!(stored.completed_at, Some(at(9, 0)));
    assert_eq!(stored.last_watched_at, at(9, 30));

    let found = ctx
        .runtime
        .block_on(repository.find(&ProgressKey::new(user_id, lesson_id)))
        .expect("find")
        .expect("row exists");
    assert_eq!(found, stored);
}

#[rstest]
fn progress_for_a_user_lists_most_recent_first(db: Option<TestContext>) {
    let Some(ctx) = db else {
        eprintln!("SKIP-TEST-CLUSTER: progress_for_a_user_lists_most_recent_first skipped");
        return;
    };
    let repository = DieselLessonProgressRepository::new(ctx.pool.clone());
    let user_id = UserId::random();
    let older = LessonId::from_uuid(Uuid::new_v4());
    let newer = LessonId::from_uuid(Uuid::new_v4());

    let rows = ctx.runtime.block_on(async {
        repository
            .upsert(&sample(&user_id, older, 30, None, at(8, 0)))
            .await
            .expect("older");
        repository
            .upsert(&sample(&user_id, newer, 45, None, at(11, 0)))
            .await
            .expect("newer");
        repository
            .upsert(&sample(&UserId::random(), newer, 90, None, at(12, 0)))
            .await
            .expect("other learner");
        repository.list_for_user(&user_id).await.expect("list")
    });

    let lessons: Vec<_> = rows.iter().map(|row| row.lesson_id).collect();
    assert_eq!(lessons, vec![newer, older]);
}

#[rstest]
fn concurrent_awards_are_all_credited(db: Option<TestContext>) {
    let Some(ctx) = db else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_awards_are_all_credited skipped");
        return;
    };
    let repository = DieselStudentPointsRepository::new(ctx.pool.clone());
    let student_id = UserId::random();
    let now = at(14, 0);
    let quiz = event_award(&student_id, PointEventKind::QuizPassed, now);
    let post = event_award(&student_id, PointEventKind::PostCreated, now);
    let like = event_award(&student_id, PointEventKind::LikeReceived, now);

    let (points, quizzes) = ctx.runtime.block_on(async {
        let (first, second, third) = tokio::join!(
            repository.apply_award(&quiz),
            repository.apply_award(&post),
            repository.apply_award(&like),
        );
        for applied in [first, second, third] {
            let applied = applied.expect("award applied");
            assert_eq!(applied.streak_bonus, 0);
        }
        let points = repository
            .find(&student_id)
            .await
            .expect("find")
            .expect("balance exists");
        let quizzes = repository
            .count_events(&student_id, PointEventKind::QuizPassed)
            .await
            .expect("count");
        (points, quizzes)
    });

    let expected = [
        PointEventKind::QuizPassed,
        PointEventKind::PostCreated,
        PointEventKind::LikeReceived,
    ]
    .into_iter()
    .map(|kind| points_for_event(kind, None))
    .sum::<u32>();
    assert_eq!(points.points, expected);
    assert_eq!(points.total_points, expected);
    assert_eq!(points.streak_days, 1);
    assert_eq!(quizzes, 1);
}

#[rstest]
fn next_day_activity_grows_the_streak_once(db: Option<TestContext>) {
    let Some(ctx) = db else {
        eprintln!("SKIP-TEST-CLUSTER: next_day_activity_grows_the_streak_once skipped");
        return;
    };
    let repository = DieselStudentPointsRepository::new(ctx.pool.clone());
    let student_id = UserId::random();
    let today = at(10, 0);
    let tomorrow = today + Duration::days(1);

    let (first, second) = ctx.runtime.block_on(async {
        repository
            .apply_award(&event_award(
                &student_id,
                PointEventKind::LessonCompleted,
                today,
            ))
            .await
            .expect("today");
        let first = repository
            .apply_award(&event_award(
                &student_id,
                PointEventKind::LessonCompleted,
                tomorrow,
            ))
            .await
            .expect("tomorrow");
        let second = repository
            .apply_award(&event_award(
                &student_id,
                PointEventKind::QuizPassed,
                tomorrow,
            ))
            .await
            .expect("tomorrow again");
        (first, second)
    });

    assert_eq!(first.balance.streak_days, 2);
    assert!(first.streak_bonus > 0);
    assert_eq!(second.streak_bonus, 0);
    assert_eq!(second.balance.streak_days, 2);
}

#[rstest]
fn repeated_unlock_reports_existing_achievement(db: Option<TestContext>) {
    let Some(ctx) = db else {
        eprintln!("SKIP-TEST-CLUSTER: repeated_unlock_reports_existing_achievement skipped");
        return;
    };
    let repository = DieselAchievementRepository::new(ctx.pool.clone());
    let student_id = UserId::random();
    let unlock = StudentAchievement {
        student_id: student_id.clone(),
        achievement_id: "first_lesson".to_owned(),
        unlocked_at: at(16, 0),
    };

    let (first, second, unlocked) = ctx.runtime.block_on(async {
        let first = repository.unlock(&unlock).await.expect("first unlock");
        let later = StudentAchievement {
            unlocked_at: at(17, 0),
            ..unlock.clone()
        };
        let second = repository.unlock(&later).await.expect("second unlock");
        let unlocked = repository.list_unlocked(&student_id).await.expect("list");
        (first, second, unlocked)
    });

    assert!(first);
    assert!(!second);
    assert_eq!(unlocked, vec![unlock]);
}

#[rstest]
fn saved_subscription_reaches_membership_lookup(db: Option<TestContext>) {
    let Some(ctx) = db else {
        eprintln!("SKIP-TEST-CLUSTER: saved_subscription_reaches_membership_lookup skipped");
        return;
    };
    let repository = DieselCompanyRepository::new(ctx.pool.clone());
    let manager = UserId::random();
    let company_id =
        seed_company(ctx.database_url.as_str(), &manager, "manager").expect("seed company");
    let snapshot = SubscriptionSnapshot {
        subscription_id: "sub_123".to_owned(),
        status: SubscriptionStatus::Active,
        current_period_end: Some(at(0, 0) + Duration::days(30)),
        cancel_at_period_end: false,
    };

    let membership = ctx.runtime.block_on(async {
        repository
            .save_subscription(&company_id, &snapshot)
            .await
            .expect("save subscription");
        repository
            .find_membership(&manager)
            .await
            .expect("membership lookup")
            .expect("manager belongs to the company")
    });

    assert_eq!(membership.role, CompanyRole::Manager);
    assert_eq!(
        membership.company.subscription_status,
        Some(SubscriptionStatus::Active)
    );
    assert_eq!(
        membership.company.subscription_expires_at,
        snapshot.current_period_end
    );
    assert_eq!(
        membership.company.stripe_subscription_id.as_deref(),
        Some("sub_123")
    );
}

#[rstest]
fn saving_a_subscription_for_an_unknown_company_fails(db: Option<TestContext>) {
    let Some(ctx) = db else {
        eprintln!("SKIP-TEST-CLUSTER: saving_a_subscription_for_an_unknown_company_fails skipped");
        return;
    };
    let repository = DieselCompanyRepository::new(ctx.pool.clone());
    let snapshot = SubscriptionSnapshot {
        subscription_id: "sub_missing".to_owned(),
        status: SubscriptionStatus::Canceled,
        current_period_end: None,
        cancel_at_period_end: false,
    };

    let error = ctx
        .runtime
        .block_on(repository.save_subscription(&CompanyId::from_uuid(Uuid::new_v4()), &snapshot))
        .expect_err("unknown company");
    assert!(matches!(error, CompanyRepositoryError::Query { .. }));
}
