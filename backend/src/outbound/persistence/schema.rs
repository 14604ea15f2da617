//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Customer companies and their mirrored billing state.
    companies (id) {
        id -> Uuid,
        name -> Text,
        /// Digits-only tax id.
        cnpj -> Nullable<Varchar>,
        /// Billing provider status in snake_case.
        subscription_status -> Nullable<Text>,
        subscription_expires_at -> Nullable<Timestamptz>,
        stripe_customer_id -> Nullable<Text>,
        stripe_subscription_id -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Company membership with a `manager` or `collaborator` role.
    company_users (company_id, user_id) {
        company_id -> Uuid,
        user_id -> Uuid,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Watch progress, unique per `(user_id, lesson_id)`.
    lesson_progress (user_id, lesson_id) {
        user_id -> Uuid,
        lesson_id -> Uuid,
        completed -> Bool,
        watch_time_seconds -> Int4,
        completed_at -> Nullable<Timestamptz>,
        last_watched_at -> Timestamptz,
    }
}

diesel::table! {
    /// One balance row per student.
    student_points (student_id) {
        student_id -> Uuid,
        points -> Int4,
        total_points -> Int4,
        level -> Int4,
        streak_days -> Int4,
        last_activity_on -> Nullable<Date>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only points ledger.
    point_events (id) {
        id -> Uuid,
        student_id -> Uuid,
        kind -> Text,
        points -> Int4,
        occurred_at -> Timestamptz,
    }
}

diesel::table! {
    student_achievements (student_id, achievement_id) {
        student_id -> Uuid,
        achievement_id -> Text,
        unlocked_at -> Timestamptz,
    }
}

diesel::joinable!(company_users -> companies (company_id));

diesel::allow_tables_to_appear_in_same_query!(
    companies,
    company_users,
    lesson_progress,
    point_events,
    student_achievements,
    student_points,
);
