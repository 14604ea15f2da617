//! Collaborator access gate and subscription management service.
//!
//! The billing provider is the system of record for subscription status. This
//! service only mirrors it onto the company row and reads the mirror to decide
//! access.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info};

use crate::domain::ports::{
    BillingGateway, BillingGatewayError, CancelSubscriptionRequest, CollaboratorAccessQuery,
    CompanyRepository, CompanyRepositoryError, SubscriptionCommand,
};
use crate::domain::{
    AccessDecision, BillingPrice, Company, CompanyId, CompanyRole, Error, Retrier, RetryFailure,
    RetryPolicy, SubscriptionSnapshot, UserId,
};

fn map_company_error(error: CompanyRepositoryError) -> Error {
    match error {
        CompanyRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("company repository unavailable: {message}"))
        }
        CompanyRepositoryError::Query { message } => {
            Error::internal(format!("company repository error: {message}"))
        }
    }
}

fn map_billing_failure(failure: RetryFailure<BillingGatewayError>) -> Error {
    let attempts = failure.attempts;
    match failure.error {
        BillingGatewayError::Unavailable { message } => Error::service_unavailable(format!(
            "billing provider unavailable after {attempts} attempts: {message}"
        )),
        BillingGatewayError::NotFound { message } => {
            Error::not_found(format!("billing object not found: {message}"))
        }
        BillingGatewayError::Rejected { message } => {
            Error::internal(format!("billing provider rejected request: {message}"))
        }
        BillingGatewayError::Decode { message } => {
            Error::internal(format!("billing provider response invalid: {message}"))
        }
    }
}

/// Service implementing [`CollaboratorAccessQuery`] and [`SubscriptionCommand`].
#[derive(Clone)]
pub struct SubscriptionService<C, B> {
    company_repo: Arc<C>,
    billing: Arc<B>,
    clock: Arc<dyn Clock>,
    retrier: Retrier,
}

impl<C, B> SubscriptionService<C, B> {
    /// Create a service with Tokio backoff for provider calls.
    pub fn new(
        company_repo: Arc<C>,
        billing: Arc<B>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        let retrier = Retrier::new(retry, Arc::clone(&clock));
        Self::with_retrier(company_repo, billing, clock, retrier)
    }

    /// Create a service with an injected retrier.
    pub fn with_retrier(
        company_repo: Arc<C>,
        billing: Arc<B>,
        clock: Arc<dyn Clock>,
        retrier: Retrier,
    ) -> Self {
        Self {
            company_repo,
            billing,
            clock,
            retrier,
        }
    }
}

impl<C, B> SubscriptionService<C, B>
where
    C: CompanyRepository,
    B: BillingGateway,
{
    /// Load a company the user may act on, enforcing the required role.
    async fn authorised_company(
        &self,
        company_id: &CompanyId,
        user_id: &UserId,
        manager_only: bool,
    ) -> Result<Company, Error> {
        let role = self
            .company_repo
            .role_in(company_id, user_id)
            .await
            .map_err(map_company_error)?
            .ok_or_else(|| Error::forbidden("user does not belong to this company"))?;
        if manager_only && role != CompanyRole::Manager {
            return Err(Error::forbidden(
                "only company managers can change the plan",
            ));
        }

        self.company_repo
            .find_by_id(company_id)
            .await
            .map_err(map_company_error)?
            .ok_or_else(|| Error::not_found(format!("company {company_id} not found")))
    }

    async fn mirror(
        &self,
        company_id: &CompanyId,
        snapshot: SubscriptionSnapshot,
    ) -> Result<SubscriptionSnapshot, Error> {
        self.company_repo
            .save_subscription(company_id, &snapshot)
            .await
            .map_err(map_company_error)?;
        info!(
            %company_id,
            status = snapshot.status.as_str(),
            cancel_at_period_end = snapshot.cancel_at_period_end,
            "company subscription mirrored"
        );
        Ok(snapshot)
    }
}

fn subscription_id(company: &Company) -> Result<&str, Error> {
    company
        .stripe_subscription_id
        .as_deref()
        .ok_or_else(|| Error::not_found(format!("company {} has no subscription", company.id)))
}

#[async_trait]
impl<C, B> CollaboratorAccessQuery for SubscriptionService<C, B>
where
    C: CompanyRepository,
    B: BillingGateway,
{
    async fn check_access(&self, user_id: &UserId) -> Result<AccessDecision, Error> {
        let repo = &self.company_repo;
        let membership = self
            .retrier
            .run("company.find_membership", move || async move {
                repo.find_membership(user_id).await
            })
            .await
            .map_err(|failure| map_company_error(failure.error))?
            .value;

        let decision = match membership {
            None => AccessDecision::no_company(),
            Some(membership) => AccessDecision::evaluate(
                membership.company.id,
                membership.company.subscription_status,
                membership.company.subscription_expires_at,
                self.clock.utc(),
            ),
        };
        debug!(%user_id, granted = decision.granted, reason = ?decision.reason, "collaborator access evaluated");
        Ok(decision)
    }
}

#[async_trait]
impl<C, B> SubscriptionCommand for SubscriptionService<C, B>
where
    C: CompanyRepository,
    B: BillingGateway,
{
    async fn sync_subscription(
        &self,
        company_id: &CompanyId,
        requested_by: &UserId,
    ) -> Result<SubscriptionSnapshot, Error> {
        let company = self
            .authorised_company(company_id, requested_by, false)
            .await?;
        let subscription_id = subscription_id(&company)?;
        let billing = &self.billing;

        let snapshot = self
            .retrier
            .run("billing.fetch_subscription", move || async move {
                billing.fetch_subscription(subscription_id).await
            })
            .await
            .map_err(map_billing_failure)?
            .value;

        self.mirror(company_id, snapshot).await
    }

    async fn cancel_subscription(
        &self,
        request: CancelSubscriptionRequest,
    ) -> Result<SubscriptionSnapshot, Error> {
        let CancelSubscriptionRequest {
            company_id,
            requested_by,
            at_period_end,
        } = request;
        let company = self
            .authorised_company(&company_id, &requested_by, true)
            .await?;
        let subscription_id = subscription_id(&company)?;
        let billing = &self.billing;

        let snapshot = self
            .retrier
            .run("billing.cancel_subscription", move || async move {
                billing
                    .cancel_subscription(subscription_id, at_period_end)
                    .await
            })
            .await
            .map_err(map_billing_failure)?
            .value;

        info!(%company_id, %requested_by, at_period_end, "subscription cancellation requested");
        self.mirror(&company_id, snapshot).await
    }

    async fn list_prices(&self) -> Result<Vec<BillingPrice>, Error> {
        let billing = &self.billing;
        Ok(self
            .retrier
            .run("billing.list_prices", move || async move {
                billing.list_prices().await
            })
            .await
            .map_err(map_billing_failure)?
            .value)
    }
}

#[cfg(test)]
#[path = "subscription_service_tests.rs"]
mod tests;
