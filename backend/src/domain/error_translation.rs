//! Upstream failure classification and learner-facing translations.
//!
//! Database and billing errors arrive as a status/SQLSTATE code plus an
//! English message. Classification decides how services react; translation
//! turns the message into Portuguese for the UI. Unmapped messages pass
//! through unchanged.

use std::borrow::Cow;

/// How a service should treat an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFailureKind {
    /// Grants or row-level security refused the operation.
    PermissionDenied,
    /// Another writer got there first.
    Conflict,
    /// Network, timeout or overload; worth retrying.
    Transient,
    /// Anything else.
    Other,
}

impl UpstreamFailureKind {
    /// Expected refusals that callers swallow rather than report.
    pub fn is_suppressed(self) -> bool {
        matches!(self, Self::PermissionDenied | Self::Conflict)
    }

    /// Whether retrying can help.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }
}

const PERMISSION_CODES: &[&str] = &["42501", "401", "403"];
const CONFLICT_CODES: &[&str] = &["23505", "409"];
const TRANSIENT_CODES: &[&str] = &[
    "08000", "08001", "08003", "08004", "08006", "40001", "40P01", "53300", "57P01", "57P03",
    "408", "429", "500", "502", "503", "504",
];

const PERMISSION_MARKERS: &[&str] = &["permission denied", "row-level security", "not authorized"];
const CONFLICT_MARKERS: &[&str] = &["duplicate key", "already exists", "unique constraint"];
const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection",
    "network",
    "failed to fetch",
    "temporarily unavailable",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Classify an upstream failure from its code (SQLSTATE or HTTP status) and
/// message. The code wins when it is recognised.
///
/// # Examples
/// ```
/// use academy::domain::{UpstreamFailureKind, classify_upstream_failure};
///
/// assert_eq!(
///     classify_upstream_failure(Some("42501"), "new row violates row-level security policy"),
///     UpstreamFailureKind::PermissionDenied,
/// );
/// assert_eq!(
///     classify_upstream_failure(None, "duplicate key value violates unique constraint"),
///     UpstreamFailureKind::Conflict,
/// );
/// ```
pub fn classify_upstream_failure(code: Option<&str>, message: &str) -> UpstreamFailureKind {
    if let Some(code) = code.map(str::trim) {
        if PERMISSION_CODES.contains(&code) {
            return UpstreamFailureKind::PermissionDenied;
        }
        if CONFLICT_CODES.contains(&code) {
            return UpstreamFailureKind::Conflict;
        }
        if TRANSIENT_CODES.contains(&code) {
            return UpstreamFailureKind::Transient;
        }
    }

    let message = message.to_lowercase();
    if contains_any(&message, PERMISSION_MARKERS) {
        UpstreamFailureKind::PermissionDenied
    } else if contains_any(&message, CONFLICT_MARKERS) {
        UpstreamFailureKind::Conflict
    } else if contains_any(&message, TRANSIENT_MARKERS) {
        UpstreamFailureKind::Transient
    } else {
        UpstreamFailureKind::Other
    }
}

/// Fragment of an upstream message and its Portuguese rendering.
///
/// Matching is case-insensitive on substrings; the first hit wins, so more
/// specific fragments come first.
const TRANSLATIONS: &[(&str, &str)] = &[
    ("invalid login credentials", "E-mail ou senha incorretos."),
    ("invalid credentials", "E-mail ou senha incorretos."),
    (
        "email not confirmed",
        "E-mail ainda não confirmado. Verifique sua caixa de entrada.",
    ),
    ("user already registered", "Este e-mail já está cadastrado."),
    (
        "password should be at least",
        "A senha deve ter pelo menos 6 caracteres.",
    ),
    (
        "email rate limit exceeded",
        "Muitas tentativas. Aguarde alguns minutos e tente novamente.",
    ),
    (
        "rate limit",
        "Muitas tentativas. Aguarde alguns minutos e tente novamente.",
    ),
    ("jwt expired", "Sua sessão expirou. Faça login novamente."),
    ("login required", "Faça login para continuar."),
    (
        "only company managers",
        "Apenas gestores da empresa podem alterar o plano.",
    ),
    (
        "does not belong to this company",
        "Você não faz parte desta empresa.",
    ),
    (
        "has no subscription",
        "A empresa não possui uma assinatura ativa.",
    ),
    (
        "permission denied",
        "Você não tem permissão para realizar esta ação.",
    ),
    ("duplicate key", "Este registro já existe."),
    (
        "billing provider unavailable",
        "O serviço de pagamentos está indisponível. Tente novamente em instantes.",
    ),
    (
        "unavailable",
        "Serviço temporariamente indisponível. Tente novamente em instantes.",
    ),
    (
        "failed to fetch",
        "Falha de conexão. Verifique sua internet e tente novamente.",
    ),
    ("not found", "Registro não encontrado."),
    (
        "internal server error",
        "Ocorreu um erro inesperado. Tente novamente mais tarde.",
    ),
];

/// Translate an upstream message for learners.
///
/// # Examples
/// ```
/// use academy::domain::translate_upstream_message;
///
/// assert_eq!(
///     translate_upstream_message("Invalid login credentials"),
///     "E-mail ou senha incorretos.",
/// );
/// assert_eq!(translate_upstream_message("Something odd"), "Something odd");
/// ```
pub fn translate_upstream_message(message: &str) -> Cow<'_, str> {
    let lowered = message.to_lowercase();
    TRANSLATIONS
        .iter()
        .find(|(fragment, _)| lowered.contains(fragment))
        .map_or(Cow::Borrowed(message), |(_, translated)| {
            Cow::Borrowed(*translated)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("42501"), "whatever", UpstreamFailureKind::PermissionDenied)]
    #[case(Some("23505"), "whatever", UpstreamFailureKind::Conflict)]
    #[case(Some("409"), "whatever", UpstreamFailureKind::Conflict)]
    #[case(Some("08006"), "whatever", UpstreamFailureKind::Transient)]
    #[case(Some("503"), "whatever", UpstreamFailureKind::Transient)]
    #[case(
        None,
        "permission denied for table lesson_progress",
        UpstreamFailureKind::PermissionDenied
    )]
    #[case(None, "Connection reset by peer", UpstreamFailureKind::Transient)]
    #[case(
        Some("22P02"),
        "invalid input syntax for type uuid",
        UpstreamFailureKind::Other
    )]
    fn classification(
        #[case] code: Option<&str>,
        #[case] message: &str,
        #[case] expected: UpstreamFailureKind,
    ) {
        assert_eq!(classify_upstream_failure(code, message), expected);
    }

    #[rstest]
    fn suppression_and_retry_flags() {
        assert!(UpstreamFailureKind::PermissionDenied.is_suppressed());
        assert!(UpstreamFailureKind::Conflict.is_suppressed());
        assert!(!UpstreamFailureKind::Transient.is_suppressed());
        assert!(UpstreamFailureKind::Transient.is_retryable());
        assert!(!UpstreamFailureKind::Other.is_retryable());
    }

    #[rstest]
    #[case("Invalid login credentials", "E-mail ou senha incorretos.")]
    #[case("JWT expired", "Sua sessão expirou. Faça login novamente.")]
    #[case(
        "billing provider unavailable after 3 attempts: 503",
        "O serviço de pagamentos está indisponível. Tente novamente em instantes."
    )]
    #[case(
        "Internal server error",
        "Ocorreu um erro inesperado. Tente novamente mais tarde."
    )]
    #[case("Lesson id must be a valid UUID", "Lesson id must be a valid UUID")]
    fn translations(#[case] message: &str, #[case] expected: &str) {
        assert_eq!(translate_upstream_message(message), expected);
    }
}
