//! Readiness and liveness endpoints.
//!
//! Readiness also reports which adapters serve the store and billing, since
//! the server falls back to fixtures when `ACADEMY_DATABASE_URL` or the Stripe
//! key is missing and a deployment should be able to tell.

use std::sync::OnceLock;

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use utoipa::ToSchema;

/// Adapter family behind a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// In-memory fixture data.
    Fixture,
    /// Diesel repositories over PostgreSQL.
    Postgres,
    /// Stripe REST API.
    Stripe,
}

/// Adapters wired into the running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Wiring {
    /// Progress, gamification and company storage.
    pub store: AdapterKind,
    /// Subscription provider.
    pub billing: AdapterKind,
}

/// Readiness report.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessBody {
    /// Whether the server accepts traffic.
    pub ready: bool,
    /// Storage adapter, once ready.
    pub store: Option<AdapterKind>,
    /// Billing adapter, once ready.
    pub billing: Option<AdapterKind>,
}

/// Shared readiness state, set once the server is bound.
#[derive(Debug, Default)]
pub struct HealthState {
    wiring: OnceLock<Wiring>,
}

impl HealthState {
    /// State that reports not ready.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the adapters in use and start reporting ready. Later calls are
    /// ignored.
    pub fn mark_ready(&self, wiring: Wiring) {
        let _ = self.wiring.set(wiring);
    }

    /// Whether [`HealthState::mark_ready`] has been called.
    pub fn is_ready(&self) -> bool {
        self.wiring.get().is_some()
    }

    fn report(&self) -> ReadinessBody {
        let wiring = self.wiring.get();
        ReadinessBody {
            ready: wiring.is_some(),
            store: wiring.map(|w| w.store),
            billing: wiring.map(|w| w.billing),
        }
    }
}

/// Readiness check. 200 with the adapter wiring once bound, 503 before.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is ready to handle traffic", body = ReadinessBody),
        (status = 503, description = "Server is still starting", body = ReadinessBody)
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    let report = state.report();
    let mut response = if report.ready {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(report)
}

/// Liveness check. Answers 200 whenever the process can serve a request.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses((status = 200, description = "Server is alive"))
)]
#[get("/health/live")]
pub async fn live() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}
