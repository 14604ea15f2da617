//! DTOs for decoding Stripe JSON responses.
//!
//! Responses decode into these transport DTOs first, then map into domain
//! values in one pass.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{BillingInterval, BillingPrice, SubscriptionSnapshot, SubscriptionStatus};

#[derive(Debug, Deserialize)]
pub(super) struct SubscriptionDto {
    pub(super) id: String,
    pub(super) status: String,
    /// Present on API versions before 2025-03; later versions move it onto
    /// the subscription items.
    pub(super) current_period_end: Option<i64>,
    #[serde(default)]
    pub(super) cancel_at_period_end: bool,
    #[serde(default)]
    pub(super) items: Option<ListDto<SubscriptionItemDto>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SubscriptionItemDto {
    pub(super) current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "T: Deserialize<'de>")]
pub(super) struct ListDto<T> {
    #[serde(default)]
    pub(super) data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PriceDto {
    pub(super) id: String,
    pub(super) unit_amount: Option<i64>,
    pub(super) currency: String,
    pub(super) recurring: Option<RecurringDto>,
    pub(super) product: ProductDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct RecurringDto {
    pub(super) interval: String,
}

/// `product` is an object when expanded and a bare id otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ProductDto {
    Expanded { name: String },
    Id(String),
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    pub(super) error: ErrorDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDto {
    pub(super) message: Option<String>,
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| format!("timestamp {seconds} out of range"))
}

impl SubscriptionDto {
    pub(super) fn into_domain(self) -> Result<SubscriptionSnapshot, String> {
        let status = self
            .status
            .parse::<SubscriptionStatus>()
            .map_err(|error| error.to_string())?;
        let period_end = self.current_period_end.or_else(|| {
            self.items
                .as_ref()
                .and_then(|items| items.data.iter().find_map(|item| item.current_period_end))
        });

        Ok(SubscriptionSnapshot {
            subscription_id: self.id,
            status,
            current_period_end: period_end.map(timestamp).transpose()?,
            cancel_at_period_end: self.cancel_at_period_end,
        })
    }
}

fn parse_interval(raw: &str) -> Result<BillingInterval, String> {
    match raw {
        "day" => Ok(BillingInterval::Day),
        "week" => Ok(BillingInterval::Week),
        "month" => Ok(BillingInterval::Month),
        "year" => Ok(BillingInterval::Year),
        other => Err(format!("unknown billing interval: {other}")),
    }
}

impl PriceDto {
    /// Metered prices carry no unit amount and are not offered for purchase.
    pub(super) fn into_domain(self) -> Option<Result<BillingPrice, String>> {
        let unit_amount = self.unit_amount?;
        let product_name = match self.product {
            ProductDto::Expanded { name } => name,
            ProductDto::Id(id) => id,
        };
        let interval = match self.recurring {
            Some(recurring) => match parse_interval(&recurring.interval) {
                Ok(interval) => Some(interval),
                Err(error) => return Some(Err(error)),
            },
            None => None,
        };

        Some(Ok(BillingPrice {
            id: self.id,
            product_name,
            unit_amount,
            currency: self.currency,
            interval,
        }))
    }
}
