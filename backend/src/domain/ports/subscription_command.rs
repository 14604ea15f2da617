//! Driving ports for the access gate and subscription management.

use async_trait::async_trait;

use crate::domain::{AccessDecision, BillingPrice, CompanyId, Error, SubscriptionSnapshot, UserId};

/// Domain use-case port answering "may this collaborator study?".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollaboratorAccessQuery: Send + Sync {
    /// Resolve the user's company and apply the access gate.
    async fn check_access(&self, user_id: &UserId) -> Result<AccessDecision, Error>;
}

/// Request to cancel a company's plan.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionRequest {
    /// Company whose plan is cancelled.
    pub company_id: CompanyId,
    /// User asking; must manage the company.
    pub requested_by: UserId,
    /// Keep access until the paid period ends.
    pub at_period_end: bool,
}

/// Domain use-case port for subscription management.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionCommand: Send + Sync {
    /// Pull the subscription from the provider and mirror it on the company.
    async fn sync_subscription(
        &self,
        company_id: &CompanyId,
        requested_by: &UserId,
    ) -> Result<SubscriptionSnapshot, Error>;

    /// Cancel the company's subscription and mirror the result.
    async fn cancel_subscription(
        &self,
        request: CancelSubscriptionRequest,
    ) -> Result<SubscriptionSnapshot, Error>;

    /// Prices available for purchase.
    async fn list_prices(&self) -> Result<Vec<BillingPrice>, Error>;
}

/// Fixture access query that denies everyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCollaboratorAccessQuery;

#[async_trait]
impl CollaboratorAccessQuery for FixtureCollaboratorAccessQuery {
    async fn check_access(&self, _user_id: &UserId) -> Result<AccessDecision, Error> {
        Ok(AccessDecision::no_company())
    }
}

/// Fixture command with no billing provider behind it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSubscriptionCommand;

#[async_trait]
impl SubscriptionCommand for FixtureSubscriptionCommand {
    async fn sync_subscription(
        &self,
        company_id: &CompanyId,
        _requested_by: &UserId,
    ) -> Result<SubscriptionSnapshot, Error> {
        Err(Error::not_found(format!("company {company_id} not found")))
    }

    async fn cancel_subscription(
        &self,
        request: CancelSubscriptionRequest,
    ) -> Result<SubscriptionSnapshot, Error> {
        Err(Error::not_found(format!(
            "company {} not found",
            request.company_id
        )))
    }

    async fn list_prices(&self) -> Result<Vec<BillingPrice>, Error> {
        Ok(Vec::new())
    }
}
