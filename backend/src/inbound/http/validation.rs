//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every failure becomes an `invalid_request` error whose details name the
//! offending field and a stable snake_case code.

use serde_json::json;

use crate::domain::{
    CompanyId, Error, LessonId, LessonProgressValidationError, PointEventKind, WatchSample,
};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    OutOfRange,
    UnknownValue,
    NotAllowed,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::OutOfRange => "out_of_range",
            ErrorCode::UnknownValue => "unknown_value",
            ErrorCode::NotAllowed => "not_allowed",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

pub(crate) const LESSON_ID: FieldName = FieldName::new("lessonId");
pub(crate) const COMPANY_ID: FieldName = FieldName::new("companyId");
pub(crate) const WATCH_TIME: FieldName = FieldName::new("watchTimeSeconds");
pub(crate) const DURATION: FieldName = FieldName::new("durationSeconds");
pub(crate) const EVENT_KIND: FieldName = FieldName::new("kind");

/// Builder for validation errors with field context.
struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be a valid UUID"))
        .with_value(ErrorCode::InvalidUuid, value)
}

pub(crate) fn parse_lesson_id(value: &str) -> Result<LessonId, Error> {
    LessonId::new(value).map_err(|_| invalid_uuid_error(LESSON_ID, value))
}

pub(crate) fn parse_company_id(value: &str) -> Result<CompanyId, Error> {
    CompanyId::new(value).map_err(|_| invalid_uuid_error(COMPANY_ID, value))
}

/// Validate a player sample, naming the offending field on failure.
pub(crate) fn parse_watch_sample(
    watch_time_seconds: u32,
    duration_seconds: Option<u32>,
) -> Result<WatchSample, Error> {
    WatchSample::new(watch_time_seconds, duration_seconds).map_err(|error| {
        let field = match error {
            LessonProgressValidationError::ZeroDuration => DURATION,
            _ => WATCH_TIME,
        };
        ValidationError::new(field.as_str(), error.to_string()).with_code(ErrorCode::OutOfRange)
    })
}

/// Parse an event kind that clients may report directly.
///
/// Lesson completions come from the progress endpoints and streak bonuses are
/// derived server-side, so both are refused here.
pub(crate) fn parse_reportable_event_kind(value: &str) -> Result<PointEventKind, Error> {
    let field = EVENT_KIND.as_str();
    let kind = value.parse::<PointEventKind>().map_err(|error| {
        ValidationError::new(field, error.to_string()).with_value(ErrorCode::UnknownValue, value)
    })?;
    match kind {
        PointEventKind::LessonCompleted | PointEventKind::Streak => Err(ValidationError::new(
            field,
            format!("{kind} events cannot be reported directly"),
        )
        .with_value(ErrorCode::NotAllowed, value)),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode as DomainCode;
    use rstest::rstest;
    use serde_json::Value;

    fn detail<'a>(error: &'a Error, key: &str) -> Option<&'a str> {
        error
            .details()
            .and_then(|d| d.get(key))
            .and_then(Value::as_str)
    }

    #[rstest]
    fn invalid_lesson_ids_name_the_field() {
        let error = parse_lesson_id("lesson-1").expect_err("not a uuid");
        assert_eq!(error.code(), DomainCode::InvalidRequest);
        assert_eq!(detail(&error, "field"), Some("lessonId"));
        assert_eq!(detail(&error, "code"), Some("invalid_uuid"));
        assert_eq!(detail(&error, "value"), Some("lesson-1"));
    }

    #[rstest]
    #[case(700_000, Some(600), "watchTimeSeconds")]
    #[case(10, Some(0), "durationSeconds")]
    fn out_of_range_samples_name_the_field(
        #[case] watch: u32,
        #[case] duration: Option<u32>,
        #[case] field: &str,
    ) {
        let error = parse_watch_sample(watch, duration).expect_err("invalid sample");
        assert_eq!(detail(&error, "field"), Some(field));
        assert_eq!(detail(&error, "code"), Some("out_of_range"));
    }

    #[rstest]
    #[case("quiz_passed", Ok(PointEventKind::QuizPassed))]
    #[case("like_received", Ok(PointEventKind::LikeReceived))]
    #[case("lesson_completed", Err("not_allowed"))]
    #[case("streak", Err("not_allowed"))]
    #[case("teleported", Err("unknown_value"))]
    fn reportable_event_kinds(#[case] raw: &str, #[case] expected: Result<PointEventKind, &str>) {
        match (parse_reportable_event_kind(raw), expected) {
            (Ok(kind), Ok(want)) => assert_eq!(kind, want),
            (Err(error), Err(code)) => assert_eq!(detail(&error, "code"), Some(code)),
            (got, want) => panic!("{raw}: got {got:?}, want {want:?}"),
        }
    }
}
