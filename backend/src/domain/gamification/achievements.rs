//! Static achievement catalogue and unlock evaluation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{PointEventKind, StudentPoints};
use crate::domain::UserId;

/// What a student must reach to unlock an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementCriterion {
    /// Lifetime points at or above `points`.
    TotalPoints {
        /// Required lifetime points.
        points: u32,
    },
    /// Streak length at or above `days`.
    StreakDays {
        /// Required consecutive days.
        days: u32,
    },
    /// At least `count` ledger events of `kind`.
    EventCount {
        /// Event kind to count.
        kind: PointEventKind,
        /// Required number of events.
        count: u32,
    },
}

/// Catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Stable identifier stored with unlocks.
    pub id: &'static str,
    /// Display name (Portuguese, as shown to learners).
    pub name: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Unlock condition.
    pub criterion: AchievementCriterion,
    /// Bonus points credited on unlock.
    pub reward_points: u32,
}

/// Every achievement a student can unlock.
pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_lesson",
        name: "Primeiro passo",
        description: "Conclua sua primeira aula.",
        criterion: AchievementCriterion::EventCount {
            kind: PointEventKind::LessonCompleted,
            count: 1,
        },
        reward_points: 5,
    },
    Achievement {
        id: "ten_lessons",
        name: "Maratonista",
        description: "Conclua dez aulas.",
        criterion: AchievementCriterion::EventCount {
            kind: PointEventKind::LessonCompleted,
            count: 10,
        },
        reward_points: 25,
    },
    Achievement {
        id: "first_course",
        name: "Formado",
        description: "Conclua seu primeiro curso.",
        criterion: AchievementCriterion::EventCount {
            kind: PointEventKind::CourseCompleted,
            count: 1,
        },
        reward_points: 50,
    },
    Achievement {
        id: "quiz_master",
        name: "Mestre dos quizzes",
        description: "Seja aprovado em cinco quizzes.",
        criterion: AchievementCriterion::EventCount {
            kind: PointEventKind::QuizPassed,
            count: 5,
        },
        reward_points: 25,
    },
    Achievement {
        id: "community_voice",
        name: "Voz da comunidade",
        description: "Publique dez posts na comunidade.",
        criterion: AchievementCriterion::EventCount {
            kind: PointEventKind::PostCreated,
            count: 10,
        },
        reward_points: 20,
    },
    Achievement {
        id: "mentee",
        name: "Aprendiz",
        description: "Participe de uma mentoria.",
        criterion: AchievementCriterion::EventCount {
            kind: PointEventKind::MentorshipCompleted,
            count: 1,
        },
        reward_points: 15,
    },
    Achievement {
        id: "week_streak",
        name: "Uma semana firme",
        description: "Estude por sete dias seguidos.",
        criterion: AchievementCriterion::StreakDays { days: 7 },
        reward_points: 30,
    },
    Achievement {
        id: "month_streak",
        name: "Hábito formado",
        description: "Estude por trinta dias seguidos.",
        criterion: AchievementCriterion::StreakDays { days: 30 },
        reward_points: 100,
    },
    Achievement {
        id: "points_500",
        name: "Colecionador",
        description: "Acumule 500 pontos.",
        criterion: AchievementCriterion::TotalPoints { points: 500 },
        reward_points: 0,
    },
    Achievement {
        id: "points_2000",
        name: "Lenda",
        description: "Acumule 2000 pontos.",
        criterion: AchievementCriterion::TotalPoints { points: 2_000 },
        reward_points: 0,
    },
];

/// Look up a catalogue entry.
pub fn find_achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|achievement| achievement.id == id)
}

/// Recorded unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentAchievement {
    /// Student who unlocked it.
    pub student_id: UserId,
    /// Catalogue id.
    pub achievement_id: String,
    /// Unlock instant.
    pub unlocked_at: DateTime<Utc>,
}

impl AchievementCriterion {
    /// Whether the criterion holds. `event_count` returns the ledger count
    /// for a kind.
    pub fn is_met(
        &self,
        points: &StudentPoints,
        event_count: impl Fn(PointEventKind) -> u32,
    ) -> bool {
        match *self {
            Self::TotalPoints { points: required } => points.total_points >= required,
            Self::StreakDays { days } => points.streak_days >= days,
            Self::EventCount { kind, count } => event_count(kind) >= count,
        }
    }

    /// Event kind whose ledger count this criterion reads, if any.
    pub fn counted_kind(&self) -> Option<PointEventKind> {
        match *self {
            Self::EventCount { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn catalogue_ids_are_unique() {
        let ids: HashSet<_> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
    }

    #[rstest]
    fn criteria_read_the_right_inputs() {
        let mut points = StudentPoints::empty(UserId::random());
        points.credit(600);
        points.streak_days = 8;

        let lessons = |kind: PointEventKind| u32::from(kind == PointEventKind::LessonCompleted);
        let met: Vec<_> = ACHIEVEMENTS
            .iter()
            .filter(|a| a.criterion.is_met(&points, lessons))
            .map(|a| a.id)
            .collect();

        assert_eq!(met, vec!["first_lesson", "week_streak", "points_500"]);
    }

    #[rstest]
    fn lookup_by_id() {
        assert_eq!(
            find_achievement("mentee").map(|a| a.reward_points),
            Some(15)
        );
        assert!(find_achievement("unknown").is_none());
    }
}
