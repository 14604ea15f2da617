//! PostgreSQL-backed `CompanyRepository` implementation using Diesel ORM.
//!
//! Reads companies and memberships, and writes the subscription state
//! mirrored from the billing provider.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::ports::{CompanyRepository, CompanyRepositoryError};
use crate::domain::{
    Cnpj, Company, CompanyId, CompanyMembership, CompanyRole, SubscriptionSnapshot,
    SubscriptionStatus, UserId,
};

use super::diesel_helpers::{map_basic_diesel_error, map_pool_error_message};
use super::models::{CompanyRow, CompanySubscriptionUpdate, CompanyUserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{companies, company_users};

/// Diesel-backed implementation of the `CompanyRepository` port.
#[derive(Clone)]
pub struct DieselCompanyRepository {
    pool: DbPool,
}

impl DieselCompanyRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CompanyRepositoryError {
    CompanyRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> CompanyRepositoryError {
    map_basic_diesel_error(
        &error,
        operation,
        CompanyRepositoryError::query,
        CompanyRepositoryError::connection,
    )
}

fn parse_role(raw: &str) -> Result<CompanyRole, CompanyRepositoryError> {
    match raw {
        "manager" => Ok(CompanyRole::Manager),
        "collaborator" => Ok(CompanyRole::Collaborator),
        other => Err(CompanyRepositoryError::query(format!(
            "unrecognised company role: {other}"
        ))),
    }
}

/// Convert a row, dropping values that fail domain validation.
///
/// A malformed tax id or an unknown status is logged and read as absent, so
/// an unknown status denies access rather than failing the request.
fn row_to_company(row: CompanyRow) -> Company {
    let cnpj = row.cnpj.and_then(|raw| match Cnpj::new(&raw) {
        Ok(cnpj) => Some(cnpj),
        Err(error) => {
            warn!(company_id = %row.id, %error, "stored cnpj failed validation");
            None
        }
    });
    let subscription_status =
        row.subscription_status
            .and_then(|raw| match raw.parse::<SubscriptionStatus>() {
                Ok(status) => Some(status),
                Err(error) => {
                    warn!(company_id = %row.id, %error, "unrecognised subscription status");
                    None
                }
            });

    Company {
        id: CompanyId::from_uuid(row.id),
        name: row.name,
        cnpj,
        subscription_status,
        subscription_expires_at: row.subscription_expires_at,
        stripe_customer_id: row.stripe_customer_id,
        stripe_subscription_id: row.stripe_subscription_id,
    }
}

#[async_trait]
impl CompanyRepository for DieselCompanyRepository {
    async fn find_by_id(
        &self,
        company_id: &CompanyId,
    ) -> Result<Option<Company>, CompanyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<CompanyRow> = companies::table
            .filter(companies::id.eq(company_id.as_uuid()))
            .select(CompanyRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "companies.find_by_id"))?;

        Ok(row.map(row_to_company))
    }

    async fn find_membership(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CompanyMembership>, CompanyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<(CompanyUserRow, CompanyRow)> = company_users::table
            .inner_join(companies::table)
            .filter(company_users::user_id.eq(user_id.as_uuid()))
            .order_by(company_users::created_at.asc())
            .select((CompanyUserRow::as_select(), CompanyRow::as_select()))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "company_users.find_membership"))?;

        row.map(|(member, company)| {
            Ok(CompanyMembership {
                role: parse_role(&member.role)?,
                company: row_to_company(company),
            })
        })
        .transpose()
    }

    async fn role_in(
        &self,
        company_id: &CompanyId,
        user_id: &UserId,
    ) -> Result<Option<CompanyRole>, CompanyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<CompanyUserRow> = company_users::table
            .filter(company_users::company_id.eq(company_id.as_uuid()))
            .filter(company_users::user_id.eq(user_id.as_uuid()))
            .select(CompanyUserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "company_users.role_in"))?;

        row.map(|member| parse_role(&member.role)).transpose()
    }

    async fn save_subscription(
        &self,
        company_id: &CompanyId,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<(), CompanyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let update = CompanySubscriptionUpdate {
            subscription_status: Some(snapshot.status.as_str()),
            subscription_expires_at: snapshot.current_period_end,
            stripe_subscription_id: Some(snapshot.subscription_id.as_str()),
            updated_at: Utc::now(),
        };

        let updated = diesel::update(companies::table)
            .filter(companies::id.eq(company_id.as_uuid()))
            .set(&update)
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "companies.save_subscription"))?;

        if updated == 0 {
            return Err(CompanyRepositoryError::query(format!(
                "company {company_id} not found"
            )));
        }
        Ok(())
    }
}
