//! Driving ports for gamification awards and reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::gamification::{Achievement, PointEventKind, StudentPoints};
use crate::domain::{Error, UserId};

/// Request to award points for one event.
#[derive(Debug, Clone)]
pub struct AwardPointsRequest {
    /// Student being credited.
    pub student_id: UserId,
    /// What happened.
    pub kind: PointEventKind,
}

/// Result of an award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardPointsResponse {
    /// Points granted for the event itself.
    pub points_awarded: u32,
    /// True when a daily cap swallowed the event's points.
    pub capped: bool,
    /// Streak bonus granted alongside the event.
    pub streak_bonus: u32,
    /// Balance after the award, including achievement rewards.
    pub balance: StudentPoints,
    /// Achievements unlocked by this award.
    pub unlocked: Vec<&'static Achievement>,
}

/// Catalogue entry with the student's unlock state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementStatus {
    /// Catalogue entry.
    pub achievement: &'static Achievement,
    /// Unlock instant, when unlocked.
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Domain use-case port for point awards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GamificationCommand: Send + Sync {
    /// Apply caps, credit points, update the streak and evaluate achievements.
    async fn award_points(&self, request: AwardPointsRequest)
    -> Result<AwardPointsResponse, Error>;
}

/// Domain use-case port for gamification reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GamificationQuery: Send + Sync {
    /// Current balance; an empty balance when the student has none yet.
    async fn get_points(&self, student_id: &UserId) -> Result<StudentPoints, Error>;

    /// Whole catalogue with unlock state.
    async fn list_achievements(&self, student_id: &UserId)
    -> Result<Vec<AchievementStatus>, Error>;
}

/// Fixture command that grants nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureGamificationCommand;

#[async_trait]
impl GamificationCommand for FixtureGamificationCommand {
    async fn award_points(
        &self,
        request: AwardPointsRequest,
    ) -> Result<AwardPointsResponse, Error> {
        Ok(AwardPointsResponse {
            points_awarded: 0,
            capped: false,
            streak_bonus: 0,
            balance: StudentPoints::empty(request.student_id),
            unlocked: Vec::new(),
        })
    }
}

/// Fixture query with empty balances and a locked catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureGamificationQuery;

#[async_trait]
impl GamificationQuery for FixtureGamificationQuery {
    async fn get_points(&self, student_id: &UserId) -> Result<StudentPoints, Error> {
        Ok(StudentPoints::empty(student_id.clone()))
    }

    async fn list_achievements(
        &self,
        _student_id: &UserId,
    ) -> Result<Vec<AchievementStatus>, Error> {
        Ok(crate::domain::gamification::ACHIEVEMENTS
            .iter()
            .map(|achievement| AchievementStatus {
                achievement,
                unlocked_at: None,
            })
            .collect())
    }
}
