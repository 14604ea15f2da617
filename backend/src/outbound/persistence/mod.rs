//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain repository ports, backed by
//! PostgreSQL through `diesel-async` with `bb8` pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories translate between Diesel rows and domain
//!   types. The only logic here is the conflict merge of the progress upsert,
//!   which repeats the domain merge so concurrent writers converge.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Classified errors**: Diesel failures go through
//!   [`classify_upstream_failure`](crate::domain::classify_upstream_failure)
//!   so permission, conflict and transient failures reach the services as
//!   distinct port error variants.
//!
//! # Example
//!
//! ```ignore
//! use academy::outbound::persistence::{DbPool, DieselLessonProgressRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/academy")).await?;
//! let repo = DieselLessonProgressRepository::new(pool);
//! ```

mod diesel_achievement_repository;
mod diesel_company_repository;
pub(crate) mod diesel_helpers;
mod diesel_lesson_progress_repository;
mod diesel_student_points_repository;
mod models;
mod pool;
mod schema;

pub use diesel_achievement_repository::DieselAchievementRepository;
pub use diesel_company_repository::DieselCompanyRepository;
pub use diesel_lesson_progress_repository::DieselLessonProgressRepository;
pub use diesel_student_points_repository::DieselStudentPointsRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
