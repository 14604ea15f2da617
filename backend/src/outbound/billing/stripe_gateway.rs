//! Reqwest-backed Stripe billing gateway.
//!
//! This adapter owns transport details only: authentication, timeout and HTTP
//! error mapping, and JSON decoding into domain snapshots and prices.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{ErrorEnvelopeDto, ListDto, PriceDto, SubscriptionDto};
use crate::domain::ports::{BillingGateway, BillingGatewayError};
use crate::domain::{BillingPrice, SubscriptionSnapshot};

/// Production Stripe API root.
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1/";

/// Billing gateway that talks to the Stripe REST API.
pub struct StripeBillingGateway {
    client: Client,
    base_url: Url,
    secret_key: Zeroizing<String>,
}

impl StripeBillingGateway {
    /// Build a gateway with an explicit request timeout.
    ///
    /// `base_url` must end with a slash so relative paths join beneath it.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        secret_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            secret_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BillingGatewayError> {
        self.base_url.join(path).map_err(|error| {
            BillingGatewayError::rejected(format!("invalid endpoint {path}: {error}"))
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, BillingGatewayError> {
        let response = request
            .bearer_auth(self.secret_key.as_str())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(
            operation,
            status = status.as_u16(),
            "billing provider responded"
        );
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        serde_json::from_slice(body.as_ref()).map_err(|error| {
            BillingGatewayError::decode(format!("invalid {operation} payload: {error}"))
        })
    }
}

#[async_trait]
impl BillingGateway for StripeBillingGateway {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, BillingGatewayError> {
        let url = self.endpoint(&format!("subscriptions/{subscription_id}"))?;
        let dto: SubscriptionDto = self.send("subscription", self.client.get(url)).await?;
        dto.into_domain().map_err(BillingGatewayError::decode)
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<SubscriptionSnapshot, BillingGatewayError> {
        let url = self.endpoint(&format!("subscriptions/{subscription_id}"))?;
        let request = if at_period_end {
            self.client
                .post(url)
                .form(&[("cancel_at_period_end", "true")])
        } else {
            self.client.delete(url)
        };
        let dto: SubscriptionDto = self.send("subscription cancel", request).await?;
        dto.into_domain().map_err(BillingGatewayError::decode)
    }

    async fn list_prices(&self) -> Result<Vec<BillingPrice>, BillingGatewayError> {
        let url = self.endpoint("prices")?;
        let request = self.client.get(url).query(&[
            ("active", "true"),
            ("limit", "100"),
            ("expand[]", "data.product"),
        ]);
        let list: ListDto<PriceDto> = self.send("price list", request).await?;
        list.data
            .into_iter()
            .filter_map(PriceDto::into_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(BillingGatewayError::decode)
    }
}

fn map_transport_error(error: reqwest::Error) -> BillingGatewayError {
    BillingGatewayError::unavailable(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> BillingGatewayError {
    let detail = serde_json::from_slice::<ErrorEnvelopeDto>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_default();
    let message = if detail.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {detail}", status.as_u16())
    };

    match status {
        StatusCode::NOT_FOUND => BillingGatewayError::not_found(message),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            BillingGatewayError::unavailable(message)
        }
        _ if status.is_server_error() => BillingGatewayError::unavailable(message),
        _ => BillingGatewayError::rejected(message),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network Stripe mapping helpers.

    use super::*;
    use crate::domain::{BillingInterval, Retryable, SubscriptionStatus};
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::NOT_FOUND, "NotFound")]
    #[case(StatusCode::TOO_MANY_REQUESTS, "Unavailable")]
    #[case(StatusCode::SERVICE_UNAVAILABLE, "Unavailable")]
    #[case(StatusCode::UNAUTHORIZED, "Rejected")]
    #[case(StatusCode::BAD_REQUEST, "Rejected")]
    fn maps_http_statuses_to_gateway_errors(#[case] status: StatusCode, #[case] expected: &str) {
        let error = map_status_error(status, br#"{"error":{"message":"No such subscription"}}"#);
        let matched = match expected {
            "NotFound" => matches!(error, BillingGatewayError::NotFound { .. }),
            "Unavailable" => matches!(error, BillingGatewayError::Unavailable { .. }),
            "Rejected" => matches!(error, BillingGatewayError::Rejected { .. }),
            _ => panic!("unsupported test expectation: {expected}"),
        };
        assert!(matched, "{status} mapped to {error:?}");
    }

    #[rstest]
    fn status_errors_keep_the_provider_message() {
        let error = map_status_error(
            StatusCode::NOT_FOUND,
            br#"{"error":{"message":"No such subscription: 'sub_404'"}}"#,
        );
        assert_eq!(
            error.to_string(),
            "billing object not found: status 404: No such subscription: 'sub_404'"
        );
        assert!(!error.is_retryable());
    }

    #[rstest]
    fn decodes_subscription_with_item_level_period_end() {
        let body = r#"{
            "id": "sub_123",
            "status": "past_due",
            "cancel_at_period_end": true,
            "items": { "data": [ { "current_period_end": 1775001600 } ] }
        }"#;

        let dto: SubscriptionDto = serde_json::from_str(body).expect("JSON should decode");
        let snapshot = dto.into_domain().expect("known status");
        assert_eq!(snapshot.status, SubscriptionStatus::PastDue);
        assert!(snapshot.cancel_at_period_end);
        assert_eq!(
            snapshot.current_period_end.map(|at| at.timestamp()),
            Some(1_775_001_600)
        );
    }

    #[rstest]
    fn unknown_subscription_status_fails_decoding() {
        let body = r#"{ "id": "sub_123", "status": "frozen" }"#;
        let dto: SubscriptionDto = serde_json::from_str(body).expect("JSON should decode");
        assert!(dto.into_domain().is_err());
    }

    #[rstest]
    fn decodes_prices_and_skips_metered_ones() {
        let body = r#"{
            "data": [
                {
                    "id": "price_monthly",
                    "unit_amount": 19900,
                    "currency": "brl",
                    "recurring": { "interval": "month" },
                    "product": { "id": "prod_1", "name": "Plano Empresa" }
                },
                {
                    "id": "price_metered",
                    "unit_amount": null,
                    "currency": "brl",
                    "recurring": { "interval": "month" },
                    "product": "prod_2"
                }
            ]
        }"#;

        let list: ListDto<PriceDto> = serde_json::from_str(body).expect("JSON should decode");
        let prices: Vec<BillingPrice> = list
            .data
            .into_iter()
            .filter_map(PriceDto::into_domain)
            .collect::<Result<_, _>>()
            .expect("valid prices");

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].product_name, "Plano Empresa");
        assert_eq!(prices[0].interval, Some(BillingInterval::Month));
    }
}
