//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Repositories convert them at the edge.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    companies, company_users, lesson_progress, point_events, student_achievements, student_points,
};

// ---------------------------------------------------------------------------
// Lesson progress
// ---------------------------------------------------------------------------

/// Row struct for reading and upserting `lesson_progress`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = lesson_progress)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LessonProgressRow {
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: bool,
    pub watch_time_seconds: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_watched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Gamification
// ---------------------------------------------------------------------------

/// Row struct for reading `student_points`.
///
/// `level` is left out: it is always recomputed from `total_points`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = student_points)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StudentPointsRow {
    pub student_id: Uuid,
    pub points: i32,
    pub total_points: i32,
    pub streak_days: i32,
    pub last_activity_on: Option<NaiveDate>,
}

/// Insertable struct for a student's zero balance row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = student_points)]
pub(crate) struct NewStudentPointsRow {
    pub student_id: Uuid,
    pub points: i32,
    pub total_points: i32,
    pub level: i32,
    pub streak_days: i32,
    pub last_activity_on: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset written back after an award is applied to the locked row.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = student_points)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct StudentPointsUpdate {
    pub points: i32,
    pub total_points: i32,
    pub level: i32,
    pub streak_days: i32,
    pub last_activity_on: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable ledger entry.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = point_events)]
pub(crate) struct NewPointEventRow<'a> {
    pub id: Uuid,
    pub student_id: Uuid,
    pub kind: &'a str,
    pub points: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Row struct for reading and inserting `student_achievements`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = student_achievements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StudentAchievementRow {
    pub student_id: Uuid,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

/// Row struct for reading `companies`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = companies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CompanyRow {
    pub id: Uuid,
    pub name: String,
    pub cnpj: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

/// Row struct for reading `company_users`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = company_users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CompanyUserRow {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
}

/// Changeset mirroring billing state onto a company.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = companies)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct CompanySubscriptionUpdate<'a> {
    pub subscription_status: Option<&'a str>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub stripe_subscription_id: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}
