//! Port for company membership lookups and subscription write-back.

use async_trait::async_trait;

use crate::domain::{
    Company, CompanyId, CompanyMembership, CompanyRole, SubscriptionSnapshot, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by company repository adapters.
    pub enum CompanyRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "company repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "company repository query failed: {message}",
    }
    retryable: Connection;
}

/// Port for reading companies and storing mirrored subscription state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Company by id.
    async fn find_by_id(
        &self,
        company_id: &CompanyId,
    ) -> Result<Option<Company>, CompanyRepositoryError>;

    /// The company a user belongs to, with their role.
    async fn find_membership(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CompanyMembership>, CompanyRepositoryError>;

    /// Role of `user_id` inside `company_id`, if they belong to it.
    async fn role_in(
        &self,
        company_id: &CompanyId,
        user_id: &UserId,
    ) -> Result<Option<CompanyRole>, CompanyRepositoryError>;

    /// Store status, expiry and subscription id on the company.
    async fn save_subscription(
        &self,
        company_id: &CompanyId,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<(), CompanyRepositoryError>;
}

/// Fixture implementation with no companies.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCompanyRepository;

#[async_trait]
impl CompanyRepository for FixtureCompanyRepository {
    async fn find_by_id(
        &self,
        _company_id: &CompanyId,
    ) -> Result<Option<Company>, CompanyRepositoryError> {
        Ok(None)
    }

    async fn find_membership(
        &self,
        _user_id: &UserId,
    ) -> Result<Option<CompanyMembership>, CompanyRepositoryError> {
        Ok(None)
    }

    async fn role_in(
        &self,
        _company_id: &CompanyId,
        _user_id: &UserId,
    ) -> Result<Option<CompanyRole>, CompanyRepositoryError> {
        Ok(None)
    }

    async fn save_subscription(
        &self,
        _company_id: &CompanyId,
        _snapshot: &SubscriptionSnapshot,
    ) -> Result<(), CompanyRepositoryError> {
        Ok(())
    }
}
