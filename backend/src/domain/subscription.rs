//! Subscription status mirrored from the billing provider and the
//! collaborator access gate derived from it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CompanyId;

/// Billing provider subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current.
    Active,
    /// Inside the free trial.
    Trialing,
    /// Renewal payment failed; provider is retrying.
    PastDue,
    /// Ended.
    Canceled,
    /// First payment pending.
    Incomplete,
    /// First payment never completed.
    IncompleteExpired,
    /// Retries exhausted without payment.
    Unpaid,
    /// Paused by the provider.
    Paused,
}

/// Error returned when the provider reports an unknown status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown subscription status: {0}")]
pub struct UnknownSubscriptionStatus(pub String);

impl SubscriptionStatus {
    /// Every status, in provider documentation order.
    pub const ALL: [Self; 8] = [
        Self::Active,
        Self::Trialing,
        Self::PastDue,
        Self::Canceled,
        Self::Incomplete,
        Self::IncompleteExpired,
        Self::Unpaid,
        Self::Paused,
    ];

    /// Provider spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
        }
    }

    /// Whether the status lets collaborators in, ignoring expiry.
    pub fn grants_access(self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = UnknownSubscriptionStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownSubscriptionStatus(value.to_owned()))
    }
}

/// Collaborator access gate.
///
/// Access requires an active or trialing status and, when an expiry is set,
/// an expiry strictly in the future.
///
/// # Examples
/// ```
/// use academy::domain::{SubscriptionStatus, has_collaborator_access};
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// assert!(!has_collaborator_access(SubscriptionStatus::Canceled, None, now));
/// assert!(has_collaborator_access(
///     SubscriptionStatus::Trialing,
///     Some(now + Duration::days(3)),
///     now,
/// ));
/// ```
pub fn has_collaborator_access(
    status: SubscriptionStatus,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    status.grants_access() && expires_at.is_none_or(|expiry| expiry > now)
}

/// Why a collaborator was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDenialReason {
    /// The user belongs to no company.
    NoCompany,
    /// The company never subscribed.
    NoSubscription,
    /// The status does not grant access.
    InactiveSubscription,
    /// The paid period ended.
    Expired,
}

/// Outcome of the access gate for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    /// Whether the user may use the learning area.
    pub granted: bool,
    /// Company consulted, if any.
    pub company_id: Option<CompanyId>,
    /// Status consulted, if any.
    pub status: Option<SubscriptionStatus>,
    /// Expiry consulted, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Denial reason when not granted.
    pub reason: Option<AccessDenialReason>,
}

impl AccessDecision {
    /// Evaluate the gate for a company's mirrored subscription.
    pub fn evaluate(
        company_id: CompanyId,
        status: Option<SubscriptionStatus>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let reason = match status {
            None => Some(AccessDenialReason::NoSubscription),
            Some(status) if !status.grants_access() => {
                Some(AccessDenialReason::InactiveSubscription)
            }
            Some(status) if !has_collaborator_access(status, expires_at, now) => {
                Some(AccessDenialReason::Expired)
            }
            Some(_) => None,
        };
        Self {
            granted: reason.is_none(),
            company_id: Some(company_id),
            status,
            expires_at,
            reason,
        }
    }

    /// Denial for users without a company.
    pub fn no_company() -> Self {
        Self {
            granted: false,
            company_id: None,
            status: None,
            expires_at: None,
            reason: Some(AccessDenialReason::NoCompany),
        }
    }
}

/// Subscription state written back to the company after a sync or cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    /// Provider subscription id.
    pub subscription_id: String,
    /// Provider status.
    pub status: SubscriptionStatus,
    /// End of the current period.
    pub current_period_end: Option<DateTime<Utc>>,
    /// Whether the subscription ends at `current_period_end`.
    pub cancel_at_period_end: bool,
}

/// Recurring interval of a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    /// Daily.
    Day,
    /// Weekly.
    Week,
    /// Monthly.
    Month,
    /// Yearly.
    Year,
}

/// Plan price offered for purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingPrice {
    /// Provider price id.
    pub id: String,
    /// Product display name.
    pub product_name: String,
    /// Amount in the smallest currency unit.
    pub unit_amount: i64,
    /// ISO currency code, lowercase.
    pub currency: String,
    /// Recurring interval; `None` for one-off prices.
    pub interval: Option<BillingInterval>,
}
