//! Builders for HTTP state ports and repository-backed services.

use std::sync::Arc;

use academy::domain::ports::{
    BillingGateway, CollaboratorAccessQuery, FixtureBillingGateway, FixtureCollaboratorAccessQuery,
    FixtureGamificationCommand, FixtureGamificationQuery, FixtureLessonProgressCommand,
    FixtureLessonProgressQuery, FixtureLoginService, FixtureSubscriptionCommand,
    GamificationCommand, GamificationQuery, LessonCompletionObserver, LessonProgressCommand,
    LessonProgressQuery, SubscriptionCommand,
};
use academy::domain::{
    GamificationService, LessonProgressService, RetryPolicy, SubscriptionService,
};
use academy::inbound::http::state::{HttpState, HttpStatePorts};
use academy::outbound::billing::StripeBillingGateway;
use academy::outbound::persistence::{
    DbPool, DieselAchievementRepository, DieselCompanyRepository, DieselLessonProgressRepository,
    DieselStudentPointsRepository,
};
use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::info;

use super::{BillingConfig, ServerConfig};

/// Build a command/query service pair using real services when a pool is
/// available, otherwise using fixture implementations.
fn build_service_pair<Pool, S, Cmd, Query, MakeService, Cast>(
    pool: &Option<Pool>,
    make_service: MakeService,
    fixtures: (Arc<Cmd>, Arc<Query>),
    cast: Cast,
) -> (Arc<Cmd>, Arc<Query>)
where
    S: 'static,
    Cmd: ?Sized + 'static,
    Query: ?Sized + 'static,
    MakeService: FnOnce(&Pool) -> S,
    Cast: FnOnce(Arc<S>) -> (Arc<Cmd>, Arc<Query>),
{
    match pool {
        Some(pool) => {
            let service = Arc::new(make_service(pool));
            cast(service)
        }
        None => fixtures,
    }
}

type DieselGamificationService =
    GamificationService<DieselStudentPointsRepository, DieselAchievementRepository>;

fn build_gamification_service(pool: &DbPool, clock: Arc<dyn Clock>) -> DieselGamificationService {
    GamificationService::new(
        Arc::new(DieselStudentPointsRepository::new(pool.clone())),
        Arc::new(DieselAchievementRepository::new(pool.clone())),
        clock,
    )
}

/// Gamification ports plus the observer that credits completed lessons.
struct GamificationPorts {
    command: Arc<dyn GamificationCommand>,
    query: Arc<dyn GamificationQuery>,
    observer: Option<Arc<dyn LessonCompletionObserver>>,
}

fn build_gamification_ports(config: &ServerConfig, clock: &Arc<dyn Clock>) -> GamificationPorts {
    match &config.db_pool {
        Some(pool) => {
            let service = Arc::new(build_gamification_service(pool, clock.clone()));
            GamificationPorts {
                command: service.clone(),
                query: service.clone(),
                observer: Some(service),
            }
        }
        None => GamificationPorts {
            command: Arc::new(FixtureGamificationCommand),
            query: Arc::new(FixtureGamificationQuery),
            observer: None,
        },
    }
}

fn build_progress_pair(
    config: &ServerConfig,
    clock: &Arc<dyn Clock>,
    observer: Option<Arc<dyn LessonCompletionObserver>>,
) -> (Arc<dyn LessonProgressCommand>, Arc<dyn LessonProgressQuery>) {
    build_service_pair(
        &config.db_pool,
        |pool| {
            let service = LessonProgressService::new(
                Arc::new(DieselLessonProgressRepository::new(pool.clone())),
                clock.clone(),
                config.progress,
            );
            match observer {
                Some(observer) => service.with_observer(observer),
                None => service,
            }
        },
        (
            Arc::new(FixtureLessonProgressCommand) as Arc<dyn LessonProgressCommand>,
            Arc::new(FixtureLessonProgressQuery) as Arc<dyn LessonProgressQuery>,
        ),
        |service| {
            (
                service.clone() as Arc<dyn LessonProgressCommand>,
                service as Arc<dyn LessonProgressQuery>,
            )
        },
    )
}

fn stripe_gateway(billing: &BillingConfig) -> std::io::Result<StripeBillingGateway> {
    StripeBillingGateway::new(
        billing.api_base.clone(),
        billing.secret_key.clone(),
        billing.timeout,
    )
    .map_err(|err| std::io::Error::other(format!("billing client setup failed: {err}")))
}

type SubscriptionPorts = (
    Arc<dyn SubscriptionCommand>,
    Arc<dyn CollaboratorAccessQuery>,
);

fn subscription_ports<B>(
    pool: &DbPool,
    billing: B,
    clock: &Arc<dyn Clock>,
    retry: RetryPolicy,
) -> SubscriptionPorts
where
    B: BillingGateway + 'static,
{
    let service = Arc::new(SubscriptionService::new(
        Arc::new(DieselCompanyRepository::new(pool.clone())),
        Arc::new(billing),
        clock.clone(),
        retry,
    ));
    (service.clone(), service)
}

fn build_subscription_pair(
    config: &ServerConfig,
    clock: &Arc<dyn Clock>,
) -> std::io::Result<SubscriptionPorts> {
    let Some(pool) = &config.db_pool else {
        return Ok((
            Arc::new(FixtureSubscriptionCommand),
            Arc::new(FixtureCollaboratorAccessQuery),
        ));
    };
    match &config.billing {
        Some(billing) => {
            let gateway = stripe_gateway(billing)?;
            info!(api_base = %billing.api_base, "using Stripe billing gateway");
            Ok(subscription_ports(pool, gateway, clock, config.retry))
        }
        None => {
            info!("no Stripe key configured; using fixture billing gateway");
            Ok(subscription_ports(
                pool,
                FixtureBillingGateway,
                clock,
                config.retry,
            ))
        }
    }
}

/// Build the shared HTTP state from configured ports and fixture fallbacks.
///
/// # Errors
///
/// Returns an error when the billing HTTP client cannot be constructed.
pub(super) fn build_http_state(config: &ServerConfig) -> std::io::Result<web::Data<HttpState>> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let gamification = build_gamification_ports(config, &clock);
    let (progress, progress_query) = build_progress_pair(config, &clock, gamification.observer);
    let (subscriptions, access) = build_subscription_pair(config, &clock)?;

    Ok(web::Data::new(HttpState::new(HttpStatePorts {
        // Credential storage belongs to the auth provider; the development
        // authenticator stands in for it in every mode.
        login: Arc::new(FixtureLoginService),
        progress,
        progress_query,
        gamification: gamification.command,
        gamification_query: gamification.query,
        access,
        subscriptions,
    })))
}
