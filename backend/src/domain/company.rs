//! Companies that buy plans and the collaborators they enrol.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SubscriptionStatus;

/// Validation errors for company identifiers and tax ids.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompanyValidationError {
    /// Company id was not a UUID.
    #[error("company id must be a valid UUID")]
    InvalidCompanyId,
    /// CNPJ did not contain exactly fourteen digits.
    #[error("CNPJ must contain 14 digits")]
    CnpjLength,
    /// CNPJ check digits did not match.
    #[error("CNPJ check digits are invalid")]
    CnpjChecksum,
}

/// Stable company identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(Uuid);

impl CompanyId {
    /// Parse a company id from text.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CompanyValidationError> {
        Uuid::parse_str(raw.as_ref())
            .map(Self)
            .map_err(|_| CompanyValidationError::InvalidCompanyId)
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Brazilian company tax id, stored as fourteen bare digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cnpj(String);

impl Cnpj {
    /// Validate a CNPJ, accepting the usual `00.000.000/0000-00` punctuation.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::Cnpj;
    ///
    /// let cnpj = Cnpj::new("11.222.333/0001-81").expect("valid CNPJ");
    /// assert_eq!(cnpj.as_str(), "11222333000181");
    /// assert!(Cnpj::new("11.222.333/0001-80").is_err());
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CompanyValidationError> {
        let digits: Vec<u32> = raw
            .as_ref()
            .chars()
            .filter(|c| !matches!(c, '.' | '/' | '-' | ' '))
            .map(|c| c.to_digit(10).ok_or(CompanyValidationError::CnpjLength))
            .collect::<Result<_, _>>()?;
        if digits.len() != 14 {
            return Err(CompanyValidationError::CnpjLength);
        }
        if digits.iter().all(|digit| Some(digit) == digits.first()) {
            return Err(CompanyValidationError::CnpjChecksum);
        }

        let first = check_digit(&digits, &CNPJ_FIRST_WEIGHTS);
        let second = check_digit(&digits, &CNPJ_SECOND_WEIGHTS);
        if digits.get(12) != Some(&first) || digits.get(13) != Some(&second) {
            return Err(CompanyValidationError::CnpjChecksum);
        }

        Ok(Self(
            digits
                .iter()
                .filter_map(|d| char::from_digit(*d, 10))
                .collect(),
        ))
    }

    /// Bare digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        remainder => 11 - remainder,
    }
}

impl TryFrom<String> for Cnpj {
    type Error = CompanyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cnpj> for String {
    fn from(value: Cnpj) -> Self {
        value.0
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role a user holds inside a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyRole {
    /// Manages the plan and the roster.
    Manager,
    /// Enrolled learner.
    Collaborator,
}

impl CompanyRole {
    /// Stored name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Collaborator => "collaborator",
        }
    }
}

/// Company record as far as access and billing are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    /// Identifier.
    pub id: CompanyId,
    /// Display name.
    pub name: String,
    /// Tax id, when registered.
    pub cnpj: Option<Cnpj>,
    /// Status mirrored from the billing provider.
    pub subscription_status: Option<SubscriptionStatus>,
    /// End of the paid period, when known.
    pub subscription_expires_at: Option<DateTime<Utc>>,
    /// Billing provider customer id.
    pub stripe_customer_id: Option<String>,
    /// Billing provider subscription id.
    pub stripe_subscription_id: Option<String>,
}

/// A user's company together with their role in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyMembership {
    /// Company the user belongs to.
    pub company: Company,
    /// Role held.
    pub role: CompanyRole,
}
