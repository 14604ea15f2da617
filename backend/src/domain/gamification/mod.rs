//! Gamification rules: point table, daily caps, levels and streaks.
//!
//! Everything in this module is pure. The [`service`] submodule applies the
//! rules against persisted ledgers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

pub mod achievements;
pub mod service;

pub use achievements::{
    ACHIEVEMENTS, Achievement, AchievementCriterion, StudentAchievement, find_achievement,
};
pub use service::GamificationService;

/// Cumulative point thresholds for levels one to eight.
pub const LEVEL_THRESHOLDS: [u32; 8] = [0, 100, 250, 500, 1_000, 2_000, 4_000, 8_000];

/// Events that earn points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointEventKind {
    /// A lesson was completed.
    LessonCompleted,
    /// Every lesson of a course was completed.
    CourseCompleted,
    /// A quiz was passed.
    QuizPassed,
    /// A mentorship session finished.
    MentorshipCompleted,
    /// A forum post was created.
    PostCreated,
    /// A forum reply was created.
    ReplyCreated,
    /// A post or reply received a like.
    LikeReceived,
    /// First activity of the day.
    DailyLogin,
    /// Consecutive-day streak bonus.
    Streak,
}

/// Error returned when parsing an unknown event kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown point event kind: {0}")]
pub struct UnknownPointEventKind(pub String);

impl PointEventKind {
    /// Every kind, in table order.
    pub const ALL: [Self; 9] = [
        Self::LessonCompleted,
        Self::CourseCompleted,
        Self::QuizPassed,
        Self::MentorshipCompleted,
        Self::PostCreated,
        Self::ReplyCreated,
        Self::LikeReceived,
        Self::DailyLogin,
        Self::Streak,
    ];

    /// Stable snake_case name stored in the ledger.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LessonCompleted => "lesson_completed",
            Self::CourseCompleted => "course_completed",
            Self::QuizPassed => "quiz_passed",
            Self::MentorshipCompleted => "mentorship_completed",
            Self::PostCreated => "post_created",
            Self::ReplyCreated => "reply_created",
            Self::LikeReceived => "like_received",
            Self::DailyLogin => "daily_login",
            Self::Streak => "streak",
        }
    }
}

impl fmt::Display for PointEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointEventKind {
    type Err = UnknownPointEventKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownPointEventKind(value.to_owned()))
    }
}

/// Points granted for `kind`.
///
/// `streak_days` only matters for [`PointEventKind::Streak`]; a missing value
/// counts as zero days.
///
/// # Examples
/// ```
/// use academy::domain::gamification::{PointEventKind, points_for_event};
///
/// assert_eq!(points_for_event(PointEventKind::LessonCompleted, None), 10);
/// assert_eq!(points_for_event(PointEventKind::Streak, Some(10)), 50);
/// ```
pub fn points_for_event(kind: PointEventKind, streak_days: Option<u32>) -> u32 {
    match kind {
        PointEventKind::LessonCompleted => 10,
        PointEventKind::CourseCompleted => 100,
        PointEventKind::QuizPassed => 20,
        PointEventKind::MentorshipCompleted => 30,
        PointEventKind::PostCreated => 5,
        PointEventKind::ReplyCreated => 2,
        PointEventKind::LikeReceived => 1,
        PointEventKind::DailyLogin => 2,
        PointEventKind::Streak => streak_bonus(streak_days.unwrap_or(0)),
    }
}

fn streak_bonus(days: u32) -> u32 {
    match days {
        30.. => 100,
        7.. => 50,
        3.. => 20,
        _ => 5,
    }
}

/// Maximum grants per UTC day for capped kinds.
pub fn daily_cap(kind: PointEventKind) -> Option<u32> {
    match kind {
        PointEventKind::LikeReceived => Some(20),
        PointEventKind::ReplyCreated => Some(10),
        _ => None,
    }
}

/// Level reached with `total_points`, starting at one.
///
/// # Examples
/// ```
/// use academy::domain::gamification::level_for_points;
///
/// assert_eq!(level_for_points(0), 1);
/// assert_eq!(level_for_points(250), 3);
/// assert_eq!(level_for_points(1_000_000), 8);
/// ```
pub fn level_for_points(total_points: u32) -> u32 {
    let reached = LEVEL_THRESHOLDS
        .iter()
        .take_while(|threshold| total_points >= **threshold)
        .count();
    u32::try_from(reached).unwrap_or(u32::MAX).max(1)
}

/// Streak length after activity on `today`.
pub fn next_streak(current: u32, last_activity_on: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_activity_on {
        Some(last) if last == today => current.max(1),
        Some(last) if last.succ_opt() == Some(today) => current.saturating_add(1),
        _ => 1,
    }
}

/// Point balance and streak for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPoints {
    /// Owner of the balance.
    pub student_id: UserId,
    /// Current balance.
    pub points: u32,
    /// Lifetime points; drives the level.
    pub total_points: u32,
    /// Level derived from `total_points`.
    pub level: u32,
    /// Consecutive active days.
    pub streak_days: u32,
    /// Day of the last streak-bearing activity.
    pub last_activity_on: Option<NaiveDate>,
}

impl StudentPoints {
    /// Zero balance for a student without a row yet.
    pub fn empty(student_id: UserId) -> Self {
        Self {
            student_id,
            points: 0,
            total_points: 0,
            level: 1,
            streak_days: 0,
            last_activity_on: None,
        }
    }

    /// Add `delta` points and recompute the level.
    pub fn credit(&mut self, delta: u32) {
        self.points = self.points.saturating_add(delta);
        self.total_points = self.total_points.saturating_add(delta);
        self.level = level_for_points(self.total_points);
    }

    /// Register activity on `today`, returning the new streak length.
    pub fn touch(&mut self, today: NaiveDate) -> u32 {
        self.streak_days = next_streak(self.streak_days, self.last_activity_on, today);
        self.last_activity_on = Some(today);
        self.streak_days
    }
}

/// Credit applied to one balance in a single atomic step.
///
/// Stores apply it on top of the locked, current balance so concurrent awards
/// add up instead of overwriting each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsAward {
    /// Student credited.
    pub student_id: UserId,
    /// Ledger entry for the triggering event; `None` for achievement rewards.
    pub event: Option<PointEvent>,
    /// Points credited without a ledger row of their own.
    pub reward: u32,
    /// Day of streak-bearing activity, if the event extends the streak.
    pub activity_on: Option<NaiveDate>,
    /// When the award was made.
    pub occurred_at: DateTime<Utc>,
}

impl PointsAward {
    /// Achievement reward credited outside the ledger.
    pub fn reward(student_id: UserId, points: u32, occurred_at: DateTime<Utc>) -> Self {
        Self {
            student_id,
            event: None,
            reward: points,
            activity_on: None,
            occurred_at,
        }
    }
}

/// Balance after an award, with the ledger rows it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAward {
    /// Balance after the credit.
    pub balance: StudentPoints,
    /// Ledger rows to append, streak bonus included.
    pub ledger: Vec<PointEvent>,
    /// Streak bonus granted; zero when the streak did not grow today.
    pub streak_bonus: u32,
}

impl StudentPoints {
    /// Apply `award` on top of this balance.
    ///
    /// The first streak-bearing activity of a day that extends a streak past
    /// one day earns a [`PointEventKind::Streak`] bonus row.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::UserId;
    /// use academy::domain::gamification::{PointsAward, StudentPoints};
    /// use chrono::Utc;
    ///
    /// let student = UserId::random();
    /// let award = PointsAward::reward(student.clone(), 5, Utc::now());
    /// let applied = StudentPoints::empty(student).apply(&award);
    /// assert_eq!(applied.balance.total_points, 5);
    /// assert!(applied.ledger.is_empty());
    /// ```
    pub fn apply(mut self, award: &PointsAward) -> AppliedAward {
        let mut ledger: Vec<PointEvent> = award.event.iter().cloned().collect();
        let mut streak_bonus = 0;
        if let Some(day) = award.activity_on {
            let new_day = self.last_activity_on != Some(day);
            let streak = self.touch(day);
            if new_day && streak > 1 {
                streak_bonus = points_for_event(PointEventKind::Streak, Some(streak));
                ledger.push(PointEvent {
                    id: Uuid::new_v4(),
                    student_id: award.student_id.clone(),
                    kind: PointEventKind::Streak,
                    points: streak_bonus,
                    occurred_at: award.occurred_at,
                });
            }
        }
        let earned = ledger
            .iter()
            .map(|event| event.points)
            .fold(award.reward, u32::saturating_add);
        self.credit(earned);
        AppliedAward {
            balance: self,
            ledger,
            streak_bonus,
        }
    }
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointEvent {
    /// Ledger row id.
    pub id: Uuid,
    /// Student credited.
    pub student_id: UserId,
    /// What earned the points.
    pub kind: PointEventKind,
    /// Points granted; zero when a daily cap was hit.
    pub points: u32,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
}
