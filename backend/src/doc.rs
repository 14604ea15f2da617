//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers:
//!
//! - **Paths**: every HTTP endpoint from the inbound layer (login, progress,
//!   gamification, access, subscriptions, health)
//! - **Schemas**: domain type wrappers ([`ErrorSchema`], [`ErrorCodeSchema`],
//!   [`SubscriptionStatusSchema`], [`PointEventKindSchema`]) that provide
//!   OpenAPI definitions without coupling domain types to utoipa
//! - **Security**: session cookie authentication scheme
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::schemas::{
    ErrorCodeSchema, ErrorSchema, PointEventKindSchema, SubscriptionStatusSchema,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Academy learning platform API",
        description = "Lesson progress, gamification and company subscription endpoints for session-authenticated learners."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::login,
        crate::inbound::http::progress::get_lesson_progress,
        crate::inbound::http::progress::record_watch_sample,
        crate::inbound::http::progress::mark_lesson_completed,
        crate::inbound::http::progress::list_progress,
        crate::inbound::http::gamification::get_points,
        crate::inbound::http::gamification::report_event,
        crate::inbound::http::gamification::list_achievements,
        crate::inbound::http::access::check_access,
        crate::inbound::http::subscriptions::sync_subscription,
        crate::inbound::http::subscriptions::cancel_subscription,
        crate::inbound::http::subscriptions::list_prices,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        SubscriptionStatusSchema,
        PointEventKindSchema,
        crate::inbound::http::health::ReadinessBody,
        crate::inbound::http::health::AdapterKind
    )),
    tags(
        (name = "users", description = "Session login"),
        (name = "progress", description = "Lesson watch progress"),
        (name = "gamification", description = "Points, streaks and achievements"),
        (name = "subscriptions", description = "Access gate and company plans"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
