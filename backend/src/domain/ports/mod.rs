//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, the billing gateway) expose typed errors built
//! with `define_port_error!`; driving ports (commands and queries) return the
//! transport-agnostic domain [`Error`](crate::domain::Error).

mod macros;
pub(crate) use macros::define_port_error;

mod achievement_repository;
mod billing_gateway;
mod company_repository;
mod gamification_command;
mod lesson_completion_observer;
mod lesson_progress_command;
mod lesson_progress_repository;
mod login_service;
mod student_points_repository;
mod subscription_command;

#[cfg(test)]
pub use achievement_repository::MockAchievementRepository;
pub use achievement_repository::{
    AchievementRepository, AchievementRepositoryError, FixtureAchievementRepository,
};
#[cfg(test)]
pub use billing_gateway::MockBillingGateway;
pub use billing_gateway::{BillingGateway, BillingGatewayError, FixtureBillingGateway};
#[cfg(test)]
pub use company_repository::MockCompanyRepository;
pub use company_repository::{CompanyRepository, CompanyRepositoryError, FixtureCompanyRepository};
pub use gamification_command::{
    AchievementStatus, AwardPointsRequest, AwardPointsResponse, FixtureGamificationCommand,
    FixtureGamificationQuery, GamificationCommand, GamificationQuery,
};
#[cfg(test)]
pub use gamification_command::{MockGamificationCommand, MockGamificationQuery};
#[cfg(test)]
pub use lesson_completion_observer::MockLessonCompletionObserver;
pub use lesson_completion_observer::{LessonCompletionObserver, NoOpLessonCompletionObserver};
pub use lesson_progress_command::{
    FixtureLessonProgressCommand, FixtureLessonProgressQuery, LessonProgressCommand,
    LessonProgressQuery, MarkLessonCompletedRequest, ProgressUpdateResponse, ProgressWriteOutcome,
    RecordWatchSampleRequest,
};
#[cfg(test)]
pub use lesson_progress_command::{MockLessonProgressCommand, MockLessonProgressQuery};
#[cfg(test)]
pub use lesson_progress_repository::MockLessonProgressRepository;
pub use lesson_progress_repository::{
    FixtureLessonProgressRepository, LessonProgressRepository, LessonProgressRepositoryError,
};
#[cfg(test)]
pub use login_service::MockLoginService;
pub use login_service::{
    FIXTURE_LOGIN_EMAIL, FIXTURE_LOGIN_PASSWORD, FIXTURE_LOGIN_USER_ID, FixtureLoginService,
    LoginService,
};
#[cfg(test)]
pub use student_points_repository::MockStudentPointsRepository;
pub use student_points_repository::{
    FixtureStudentPointsRepository, StudentPointsRepository, StudentPointsRepositoryError,
};
pub use subscription_command::{
    CancelSubscriptionRequest, CollaboratorAccessQuery, FixtureCollaboratorAccessQuery,
    FixtureSubscriptionCommand, SubscriptionCommand,
};
#[cfg(test)]
pub use subscription_command::{MockCollaboratorAccessQuery, MockSubscriptionCommand};
