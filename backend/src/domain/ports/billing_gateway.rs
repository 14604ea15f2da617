//! Port for the external billing provider.

use async_trait::async_trait;

use crate::domain::{BillingPrice, SubscriptionSnapshot};

use super::define_port_error;

define_port_error! {
    /// Errors raised by billing gateway adapters.
    pub enum BillingGatewayError {
        /// Network failure, timeout, rate limit or provider 5xx.
        Unavailable { message: String } =>
            "billing provider unavailable: {message}",
        /// Provider refused the request (bad key, invalid parameters).
        Rejected { message: String } =>
            "billing provider rejected request: {message}",
        /// The referenced object does not exist at the provider.
        NotFound { message: String } =>
            "billing object not found: {message}",
        /// Response body could not be understood.
        Decode { message: String } =>
            "billing provider response invalid: {message}",
    }
    retryable: Unavailable;
}

/// Port for subscription and price operations at the billing provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Current state of a subscription.
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, BillingGatewayError>;

    /// Cancel now, or at the end of the paid period.
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<SubscriptionSnapshot, BillingGatewayError>;

    /// Active recurring prices.
    async fn list_prices(&self) -> Result<Vec<BillingPrice>, BillingGatewayError>;
}

/// Fixture gateway used when no provider key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureBillingGateway;

#[async_trait]
impl BillingGateway for FixtureBillingGateway {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, BillingGatewayError> {
        Err(BillingGatewayError::not_found(subscription_id))
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        _at_period_end: bool,
    ) -> Result<SubscriptionSnapshot, BillingGatewayError> {
        Err(BillingGatewayError::not_found(subscription_id))
    }

    async fn list_prices(&self) -> Result<Vec<BillingPrice>, BillingGatewayError> {
        Ok(Vec::new())
    }
}
