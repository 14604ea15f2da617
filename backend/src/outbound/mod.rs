//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **billing**: Stripe REST gateway using reqwest
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod billing;
pub mod persistence;
