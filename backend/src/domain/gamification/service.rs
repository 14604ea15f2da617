//! Gamification service: applies the point table against the ledger.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use mockable::Clock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    ACHIEVEMENTS, Achievement, PointEvent, PointEventKind, PointsAward, StudentAchievement,
    StudentPoints, daily_cap, points_for_event,
};
use crate::domain::ports::{
    AchievementRepository, AchievementRepositoryError, AchievementStatus, AwardPointsRequest,
    AwardPointsResponse, GamificationCommand, GamificationQuery, LessonCompletionObserver,
    StudentPointsRepository, StudentPointsRepositoryError,
};
use crate::domain::{Error, LessonId, UserId};

fn map_points_error(error: StudentPointsRepositoryError) -> Error {
    match error {
        StudentPointsRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("student points repository unavailable: {message}"))
        }
        StudentPointsRepositoryError::Query { message } => {
            Error::internal(format!("student points repository error: {message}"))
        }
    }
}

fn map_achievement_error(error: AchievementRepositoryError) -> Error {
    match error {
        AchievementRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("achievement repository unavailable: {message}"))
        }
        AchievementRepositoryError::Query { message } => {
            Error::internal(format!("achievement repository error: {message}"))
        }
    }
}

/// Whether an event is something the student did, and so extends a streak.
fn counts_as_activity(kind: PointEventKind) -> bool {
    !matches!(kind, PointEventKind::LikeReceived | PointEventKind::Streak)
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::default()).and_utc()
}

/// Gamification service implementing the award and read ports.
#[derive(Clone)]
pub struct GamificationService<P, A> {
    points_repo: Arc<P>,
    achievement_repo: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<P, A> GamificationService<P, A> {
    /// Create a service over the points and achievement repositories.
    pub fn new(points_repo: Arc<P>, achievement_repo: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            points_repo,
            achievement_repo,
            clock,
        }
    }
}

impl<P, A> GamificationService<P, A>
where
    P: StudentPointsRepository,
    A: AchievementRepository,
{
    async fn load_points(&self, student_id: &UserId) -> Result<StudentPoints, Error> {
        Ok(self
            .points_repo
            .find(student_id)
            .await
            .map_err(map_points_error)?
            .unwrap_or_else(|| StudentPoints::empty(student_id.clone())))
    }

    async fn is_capped(
        &self,
        student_id: &UserId,
        kind: PointEventKind,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let Some(cap) = daily_cap(kind) else {
            return Ok(false);
        };
        let today = self
            .points_repo
            .count_events_since(student_id, kind, start_of_day(now))
            .await
            .map_err(map_points_error)?;
        Ok(today >= cap)
    }

    /// Unlock every achievement whose criterion now holds, crediting rewards.
    async fn evaluate_achievements(
        &self,
        points: StudentPoints,
        now: DateTime<Utc>,
    ) -> Result<(StudentPoints, Vec<&'static Achievement>), Error> {
        let already: HashSet<String> = self
            .achievement_repo
            .list_unlocked(&points.student_id)
            .await
            .map_err(map_achievement_error)?
            .into_iter()
            .map(|unlock| unlock.achievement_id)
            .collect();

        let pending: Vec<&'static Achievement> = ACHIEVEMENTS
            .iter()
            .filter(|achievement| !already.contains(achievement.id))
            .collect();

        let mut counts: HashMap<PointEventKind, u32> = HashMap::new();
        for kind in pending
            .iter()
            .filter_map(|achievement| achievement.criterion.counted_kind())
        {
            if counts.contains_key(&kind) {
                continue;
            }
            let count = self
                .points_repo
                .count_events(&points.student_id, kind)
                .await
                .map_err(map_points_error)?;
            counts.insert(kind, count);
        }

        let mut unlocked = Vec::new();
        let mut reward = 0_u32;
        for achievement in pending {
            let met = achievement
                .criterion
                .is_met(&points, |kind| counts.get(&kind).copied().unwrap_or(0));
            if !met {
                continue;
            }
            let fresh = self
                .achievement_repo
                .unlock(&StudentAchievement {
                    student_id: points.student_id.clone(),
                    achievement_id: achievement.id.to_owned(),
                    unlocked_at: now,
                })
                .await
                .map_err(map_achievement_error)?;
            if fresh {
                info!(student_id = %points.student_id, achievement = achievement.id, "achievement unlocked");
                reward = reward.saturating_add(achievement.reward_points);
                unlocked.push(achievement);
            }
        }

        if reward == 0 {
            return Ok((points, unlocked));
        }
        let applied = self
            .points_repo
            .apply_award(&PointsAward::reward(points.student_id, reward, now))
            .await
            .map_err(map_points_error)?;
        Ok((applied.balance, unlocked))
    }
}

#[async_trait]
impl<P, A> GamificationCommand for GamificationService<P, A>
where
    P: StudentPointsRepository,
    A: AchievementRepository,
{
    async fn award_points(
        &self,
        request: AwardPointsRequest,
    ) -> Result<AwardPointsResponse, Error> {
        let AwardPointsRequest { student_id, kind } = request;
        if kind == PointEventKind::Streak {
            return Err(Error::invalid_request(
                "streak bonuses are derived from daily activity",
            ));
        }

        let now = self.clock.utc();
        let capped = self.is_capped(&student_id, kind, now).await?;
        let points_awarded = if capped {
            0
        } else {
            points_for_event(kind, None)
        };

        let award = PointsAward {
            student_id: student_id.clone(),
            event: Some(PointEvent {
                id: Uuid::new_v4(),
                student_id: student_id.clone(),
                kind,
                points: points_awarded,
                occurred_at: now,
            }),
            reward: 0,
            activity_on: counts_as_activity(kind).then(|| now.date_naive()),
            occurred_at: now,
        };
        let applied = self
            .points_repo
            .apply_award(&award)
            .await
            .map_err(map_points_error)?;
        let streak_bonus = applied.streak_bonus;
        debug!(
            %student_id,
            kind = kind.as_str(),
            points_awarded,
            streak_bonus,
            capped,
            "points awarded"
        );

        let (balance, unlocked) = self.evaluate_achievements(applied.balance, now).await?;

        Ok(AwardPointsResponse {
            points_awarded,
            capped,
            streak_bonus,
            balance,
            unlocked,
        })
    }
}

#[async_trait]
impl<P, A> GamificationQuery for GamificationService<P, A>
where
    P: StudentPointsRepository,
    A: AchievementRepository,
{
    async fn get_points(&self, student_id: &UserId) -> Result<StudentPoints, Error> {
        self.load_points(student_id).await
    }

    async fn list_achievements(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<AchievementStatus>, Error> {
        let unlocked: HashMap<String, DateTime<Utc>> = self
            .achievement_repo
            .list_unlocked(student_id)
            .await
            .map_err(map_achievement_error)?
            .into_iter()
            .map(|unlock| (unlock.achievement_id, unlock.unlocked_at))
            .collect();

        Ok(ACHIEVEMENTS
            .iter()
            .map(|achievement| AchievementStatus {
                achievement,
                unlocked_at: unlocked.get(achievement.id).copied(),
            })
            .collect())
    }
}

#[async_trait]
impl<P, A> LessonCompletionObserver for GamificationService<P, A>
where
    P: StudentPointsRepository,
    A: AchievementRepository,
{
    async fn lesson_completed(&self, user_id: &UserId, lesson_id: &LessonId) -> Result<(), Error> {
        let response = self
            .award_points(AwardPointsRequest {
                student_id: user_id.clone(),
                kind: PointEventKind::LessonCompleted,
            })
            .await?;
        debug!(%user_id, %lesson_id, total = response.balance.total_points, "lesson completion rewarded");
        Ok(())
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
