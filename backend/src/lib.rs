//! Corporate learning platform backend.
//!
//! Reconciles lesson watch progress, awards gamification points and gates
//! collaborator access on the company's subscription.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;

#[cfg(test)]
mod test_support;
