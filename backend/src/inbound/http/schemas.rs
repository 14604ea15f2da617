//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration.
//!
//! The schema wrappers mirror the structure of their corresponding domain
//! types but live in the inbound adapter layer where framework concerns belong.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
///
/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Authentication failed or is missing.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The write collided with existing state.
    #[schema(rename = "conflict")]
    Conflict,
    /// A dependency is temporarily unreachable; retrying may succeed.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`] as written by the HTTP adapter.
///
/// API error response payload with machine-readable code, the raw message and
/// its learner-facing translation.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Message returned to clients.
    #[schema(example = "Invalid login credentials")]
    message: String,
    /// Portuguese rendering of `message` for display.
    #[schema(example = "E-mail ou senha incorretos.")]
    user_message: String,
    /// Correlation identifier for tracing this error across systems.
    #[schema(example = "01HZY8B2W6X5Y7Z9ABCD1234")]
    trace_id: Option<String>,
    /// Supplementary error details for clients.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::SubscriptionStatus`].
#[derive(ToSchema)]
#[schema(as = crate::domain::SubscriptionStatus)]
pub enum SubscriptionStatusSchema {
    #[schema(rename = "active")]
    Active,
    #[schema(rename = "trialing")]
    Trialing,
    #[schema(rename = "past_due")]
    PastDue,
    #[schema(rename = "canceled")]
    Canceled,
    #[schema(rename = "unpaid")]
    Unpaid,
    #[schema(rename = "incomplete")]
    Incomplete,
    #[schema(rename = "incomplete_expired")]
    IncompleteExpired,
    #[schema(rename = "paused")]
    Paused,
}

/// OpenAPI schema for [`crate::domain::PointEventKind`].
#[derive(ToSchema)]
#[schema(as = crate::domain::PointEventKind)]
pub enum PointEventKindSchema {
    #[schema(rename = "lesson_completed")]
    LessonCompleted,
    #[schema(rename = "course_completed")]
    CourseCompleted,
    #[schema(rename = "quiz_passed")]
    QuizPassed,
    #[schema(rename = "mentorship_completed")]
    MentorshipCompleted,
    #[schema(rename = "post_created")]
    PostCreated,
    #[schema(rename = "reply_created")]
    ReplyCreated,
    #[schema(rename = "like_received")]
    LikeReceived,
    #[schema(rename = "daily_login")]
    DailyLogin,
    #[schema(rename = "streak")]
    Streak,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PointEventKind, SubscriptionStatus};
    use utoipa::PartialSchema;

    fn schema_to_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[test]
    fn error_code_schema_lists_every_code() {
        let schema_json = schema_to_json::<ErrorCodeSchema>();
        assert_eq!(ErrorCodeSchema::name(), "crate.domain.ErrorCode");
        for code in [
            "invalid_request",
            "unauthorized",
            "forbidden",
            "not_found",
            "conflict",
            "service_unavailable",
            "internal_error",
        ] {
            assert!(schema_json.contains(code), "missing {code}");
        }
    }

    #[test]
    fn error_schema_documents_the_translated_message() {
        let schema_json = schema_to_json::<ErrorSchema>();
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
        assert!(schema_json.contains("userMessage"), "missing userMessage");
        assert!(schema_json.contains("traceId"), "missing traceId");
    }

    #[test]
    fn status_schema_matches_domain_names() {
        let schema_json = schema_to_json::<SubscriptionStatusSchema>();
        for status in SubscriptionStatus::ALL {
            assert!(schema_json.contains(status.as_str()), "missing {status:?}");
        }
    }

    #[test]
    fn event_kind_schema_matches_domain_names() {
        let schema_json = schema_to_json::<PointEventKindSchema>();
        for kind in PointEventKind::ALL {
            assert!(schema_json.contains(kind.as_str()), "missing {kind}");
        }
    }
}
