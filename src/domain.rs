//! Domain models: tiers, quiz attempts, per-user aggregates, topic progress and badges.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::round1;

pub type UserId = u64;

/// Every `POINTS_PER_LEVEL` points is one level.
pub const POINTS_PER_LEVEL: u32 = 100;
pub const MASTERY_MIN_ATTEMPTS: u32 = 5;
pub const MASTERY_ACCURACY_PERCENT: u32 = 90;
/// Attempts at or above this percentage count towards `high_scores` badges.
pub const HIGH_SCORE_PERCENTAGE: f64 = 90.0;

/// Difficulty tier for generated arithmetic questions.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
  Beginner,
  Intermediate,
  Advanced,
}

impl Tier {
  pub const ALL: [Tier; 3] = [Tier::Beginner, Tier::Intermediate, Tier::Advanced];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Beginner => "beginner",
      Self::Intermediate => "intermediate",
      Self::Advanced => "advanced",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "beginner" => Some(Self::Beginner),
      "intermediate" => Some(Self::Intermediate),
      "advanced" => Some(Self::Advanced),
      _ => None,
    }
  }

  /// Distractor policy: (offset range, whether negative distractors are allowed).
  pub fn option_policy(&self) -> (i64, bool) {
    match self {
      Self::Beginner => (10, false),
      Self::Intermediate => (20, true),
      Self::Advanced => (50, true),
    }
  }
}

/// One finished quiz. Immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuizAttempt {
  pub id: Uuid,
  pub user_id: UserId,
  pub topic: String,
  pub difficulty: String,
  pub score: u32,
  pub total_questions: u32,
  pub percentage: f64,
  /// Seconds.
  pub time_taken: Option<u32>,
  pub completed_at: DateTime<Utc>,
}

impl QuizAttempt {
  /// Build an attempt; `percentage` is derived from `score / total_questions`.
  /// Callers validate `total_questions > 0` and `score <= total_questions` first.
  pub fn new(
    user_id: UserId,
    topic: impl Into<String>,
    difficulty: impl Into<String>,
    score: u32,
    total_questions: u32,
    time_taken: Option<u32>,
    completed_at: DateTime<Utc>,
  ) -> Self {
    let percentage = if total_questions == 0 {
      0.0
    } else {
      score as f64 / total_questions as f64 * 100.0
    };
    Self {
      id: Uuid::new_v4(),
      user_id,
      topic: topic.into(),
      difficulty: difficulty.into(),
      score,
      total_questions,
      percentage,
      time_taken,
      completed_at,
    }
  }

  pub fn is_perfect(&self) -> bool {
    self.percentage >= 100.0
  }

  /// Calendar day (UTC) the attempt counts towards for streaks.
  pub fn completed_on(&self) -> NaiveDate {
    self.completed_at.date_naive()
  }
}

/// Per-user aggregate, updated after every attempt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
  pub user_id: UserId,
  pub total_quizzes: u32,
  pub total_questions_answered: u32,
  pub total_correct_answers: u32,
  pub current_streak_days: u32,
  pub longest_streak_days: u32,
  pub last_quiz_date: Option<NaiveDate>,
  pub total_points: u32,
  pub level: u32,
  pub topics_mastered: u32,
  pub perfect_scores: u32,
  pub updated_at: DateTime<Utc>,
  /// Bumped on every committed write; used for optimistic concurrency.
  pub revision: u64,
}

impl UserStats {
  pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
    Self {
      user_id,
      total_quizzes: 0,
      total_questions_answered: 0,
      total_correct_answers: 0,
      current_streak_days: 0,
      longest_streak_days: 0,
      last_quiz_date: None,
      total_points: 0,
      level: 1,
      topics_mastered: 0,
      perfect_scores: 0,
      updated_at: now,
      revision: 0,
    }
  }

  pub fn level_for_points(points: u32) -> u32 {
    1 + points / POINTS_PER_LEVEL
  }

  /// Percent correct over everything answered, one decimal.
  pub fn overall_accuracy(&self) -> f64 {
    if self.total_questions_answered == 0 {
      return 0.0;
    }
    round1(self.total_correct_answers as f64 / self.total_questions_answered as f64 * 100.0)
  }
}

/// Per user × topic × difficulty aggregate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TopicProgress {
  pub user_id: UserId,
  pub topic: String,
  pub difficulty: String,
  pub attempts: u32,
  pub best_score: u32,
  pub best_percentage: f64,
  pub total_questions_answered: u32,
  pub total_correct: u32,
  /// Monotonic: never reverts to false.
  pub is_mastered: bool,
  pub last_attempt_at: Option<DateTime<Utc>>,
}

impl TopicProgress {
  pub fn new(user_id: UserId, topic: &str, difficulty: &str) -> Self {
    Self {
      user_id,
      topic: topic.to_string(),
      difficulty: difficulty.to_string(),
      attempts: 0,
      best_score: 0,
      best_percentage: 0.0,
      total_questions_answered: 0,
      total_correct: 0,
      is_mastered: false,
      last_attempt_at: None,
    }
  }

  pub fn same_key(&self, topic: &str, difficulty: &str) -> bool {
    self.topic == topic && self.difficulty == difficulty
  }

  /// Running accuracy in percent, one decimal.
  pub fn accuracy(&self) -> f64 {
    if self.total_questions_answered == 0 {
      return 0.0;
    }
    round1(self.total_correct as f64 / self.total_questions_answered as f64 * 100.0)
  }
}

/// What a badge asks for. Each kind carries its threshold.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
pub enum Requirement {
  QuizzesCompleted(u32),
  PerfectScores(u32),
  /// Number of attempts scoring at least `HIGH_SCORE_PERCENTAGE`.
  HighScores(u32),
  StreakDays(u32),
  TopicsMastered(u32),
  /// Any single attempt at or above this percentage.
  QuizPercentage(u32),
}

impl Requirement {
  /// Parse the `(requirement_type, requirement_value)` pair used in badge catalogs.
  pub fn from_parts(kind: &str, value: u32) -> Option<Self> {
    match kind {
      "quizzes_completed" => Some(Self::QuizzesCompleted(value)),
      "perfect_scores" => Some(Self::PerfectScores(value)),
      "high_scores" => Some(Self::HighScores(value)),
      "streak_days" => Some(Self::StreakDays(value)),
      "topics_mastered" => Some(Self::TopicsMastered(value)),
      "quiz_percentage" => Some(Self::QuizPercentage(value)),
      _ => None,
    }
  }

  pub fn threshold(&self) -> u32 {
    match *self {
      Self::QuizzesCompleted(n)
      | Self::PerfectScores(n)
      | Self::HighScores(n)
      | Self::StreakDays(n)
      | Self::TopicsMastered(n)
      | Self::QuizPercentage(n) => n,
    }
  }
}

/// Static catalog entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Badge {
  pub name: String,
  pub description: String,
  pub icon: String,
  pub category: String,
  pub requirement: Requirement,
  pub points: u32,
  pub color: String,
}

/// A badge a user has earned. One per (user, badge name).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserBadge {
  pub user_id: UserId,
  pub badge_name: String,
  pub earned_at: DateTime<Utc>,
  pub progress: u8,
}
