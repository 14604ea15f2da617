//! HTTP inbound adapter exposing REST endpoints.

pub mod access;
pub mod error;
pub mod gamification;
pub mod health;
pub mod progress;
pub mod schemas;
pub mod session;
pub mod state;
pub mod subscriptions;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

pub use error::ApiResult;
