//! Port for student point balances and the point event ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::UserId;
use crate::domain::gamification::{AppliedAward, PointEventKind, PointsAward, StudentPoints};

use super::define_port_error;

define_port_error! {
    /// Errors raised by student points repository adapters.
    pub enum StudentPointsRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "student points repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "student points repository query failed: {message}",
    }
}

/// Port for reading balances and recording awards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentPointsRepository: Send + Sync {
    /// Balance row for a student, if one exists.
    async fn find(
        &self,
        student_id: &UserId,
    ) -> Result<Option<StudentPoints>, StudentPointsRepositoryError>;

    /// Apply `award` on top of the stored balance and append its ledger rows.
    ///
    /// Implementations serialise concurrent awards for one student, so every
    /// credit lands exactly once.
    async fn apply_award(
        &self,
        award: &PointsAward,
    ) -> Result<AppliedAward, StudentPointsRepositoryError>;

    /// Count ledger events of `kind` at or after `since`.
    async fn count_events_since(
        &self,
        student_id: &UserId,
        kind: PointEventKind,
        since: DateTime<Utc>,
    ) -> Result<u32, StudentPointsRepositoryError>;

    /// Count all ledger events of `kind`.
    async fn count_events(
        &self,
        student_id: &UserId,
        kind: PointEventKind,
    ) -> Result<u32, StudentPointsRepositoryError>;
}

/// Fixture implementation with an always-empty ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureStudentPointsRepository;

#[async_trait]
impl StudentPointsRepository for FixtureStudentPointsRepository {
    async fn find(
        &self,
        _student_id: &UserId,
    ) -> Result<Option<StudentPoints>, StudentPointsRepositoryError> {
        Ok(None)
    }

    async fn apply_award(
        &self,
        award: &PointsAward,
    ) -> Result<AppliedAward, StudentPointsRepositoryError> {
        Ok(StudentPoints::empty(award.student_id.clone()).apply(award))
    }

    async fn count_events_since(
        &self,
        _student_id: &UserId,
        _kind: PointEventKind,
        _since: DateTime<Utc>,
    ) -> Result<u32, StudentPointsRepositoryError> {
        Ok(0)
    }

    async fn count_events(
        &self,
        _student_id: &UserId,
        _kind: PointEventKind,
    ) -> Result<u32, StudentPointsRepositoryError> {
        Ok(0)
    }
}
