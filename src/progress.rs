//! Progress & badge engine.
//!
//! A finished attempt flows through `ProgressEngine::record_attempt`:
//! counters, daily streak, level, per-topic progress and mastery, then badge
//! evaluation. All changes of one submission are committed together through
//! the `ProgressStore` port; submissions of the same user are serialized.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
  Badge, QuizAttempt, Requirement, Tier, TopicProgress, UserBadge, UserId, UserStats, HIGH_SCORE_PERCENTAGE,
  MASTERY_ACCURACY_PERCENT, MASTERY_MIN_ATTEMPTS,
};
use crate::error::{QuizError, StoreError};
use crate::store::{InMemoryStore, ProgressStore, ProgressUpdate, UserLocks};
use crate::util::{progress_percent, round1};

const MAX_COMMIT_ATTEMPTS: usize = 3;
/// Best percentage above which a topic/difficulty cell shows as mastered in the overview.
pub const OVERVIEW_MASTERY_PERCENT: f64 = 80.0;

/// How an attempt moved the daily streak.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreakChange {
  Started,
  SameDay,
  Extended,
  Reset,
  /// Attempt dated before the last recorded quiz day; ignored.
  OutOfOrder,
}

/// Badge inputs that live in the attempt log rather than in `UserStats`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AttemptFacts {
  pub high_scores: u32,
  pub best_percentage: f64,
}

impl Requirement {
  /// Current value of the quantity this requirement measures.
  pub fn current(&self, stats: &UserStats, facts: &AttemptFacts) -> f64 {
    match self {
      Requirement::QuizzesCompleted(_) => stats.total_quizzes as f64,
      Requirement::PerfectScores(_) => stats.perfect_scores as f64,
      Requirement::HighScores(_) => facts.high_scores as f64,
      Requirement::StreakDays(_) => stats.current_streak_days as f64,
      Requirement::TopicsMastered(_) => stats.topics_mastered as f64,
      Requirement::QuizPercentage(_) => facts.best_percentage,
    }
  }

  pub fn is_met(&self, stats: &UserStats, facts: &AttemptFacts) -> bool {
    self.current(stats, facts) >= self.threshold() as f64
  }

  pub fn progress(&self, stats: &UserStats, facts: &AttemptFacts) -> u8 {
    progress_percent(self.current(stats, facts), self.threshold() as f64)
  }
}

// -------- Pure update steps --------

/// Counters saturate at `u32::MAX` instead of wrapping.
pub fn apply_counters(stats: &mut UserStats, attempt: &QuizAttempt) {
  stats.total_quizzes = stats.total_quizzes.saturating_add(1);
  stats.total_questions_answered = stats.total_questions_answered.saturating_add(attempt.total_questions);
  stats.total_correct_answers = stats.total_correct_answers.saturating_add(attempt.score);
  if attempt.is_perfect() {
    stats.perfect_scores = stats.perfect_scores.saturating_add(1);
  }
}

/// Calendar-day streak: same day keeps it, next day extends it, a gap resets it to 1.
pub fn apply_streak(stats: &mut UserStats, today: NaiveDate) -> StreakChange {
  let change = match stats.last_quiz_date {
    None => {
      stats.current_streak_days = 1;
      StreakChange::Started
    }
    Some(last) => match (today - last).num_days() {
      0 => StreakChange::SameDay,
      1 => {
        stats.current_streak_days = stats.current_streak_days.saturating_add(1);
        StreakChange::Extended
      }
      d if d > 1 => {
        stats.current_streak_days = 1;
        StreakChange::Reset
      }
      _ => return StreakChange::OutOfOrder,
    },
  };
  stats.longest_streak_days = stats.longest_streak_days.max(stats.current_streak_days);
  stats.last_quiz_date = Some(today);
  change
}

/// Fold one attempt into its topic row. Returns true when this attempt made it mastered.
pub fn apply_topic_attempt(progress: &mut TopicProgress, attempt: &QuizAttempt) -> bool {
  progress.attempts = progress.attempts.saturating_add(1);
  progress.total_questions_answered = progress.total_questions_answered.saturating_add(attempt.total_questions);
  progress.total_correct = progress.total_correct.saturating_add(attempt.score);
  progress.best_score = progress.best_score.max(attempt.score);
  progress.best_percentage = progress.best_percentage.max(attempt.percentage);
  progress.last_attempt_at = Some(attempt.completed_at);

  if progress.is_mastered || progress.attempts < MASTERY_MIN_ATTEMPTS || progress.total_questions_answered == 0 {
    return false;
  }
  // Integer comparison so exactly 90% (e.g. 45/50) qualifies.
  let accurate_enough =
    progress.total_correct as u64 * 100 >= MASTERY_ACCURACY_PERCENT as u64 * progress.total_questions_answered as u64;
  if accurate_enough {
    progress.is_mastered = true;
  }
  accurate_enough
}

/// Evaluate every catalog badge the user does not hold yet. Newly satisfied
/// badges add their points to `stats` and come back both as definitions and as
/// `UserBadge` rows to persist.
pub fn award_badges(
  catalog: &[Badge],
  earned: &[UserBadge],
  stats: &mut UserStats,
  facts: &AttemptFacts,
  now: DateTime<Utc>,
) -> (Vec<Badge>, Vec<UserBadge>) {
  let held: HashSet<&str> = earned.iter().map(|b| b.badge_name.as_str()).collect();
  let mut newly_earned = Vec::new();
  let mut rows = Vec::new();

  for badge in catalog {
    if held.contains(badge.name.as_str()) || !badge.requirement.is_met(stats, facts) {
      continue;
    }
    stats.total_points = stats.total_points.saturating_add(badge.points);
    rows.push(UserBadge { user_id: stats.user_id, badge_name: badge.name.clone(), earned_at: now, progress: 100 });
    newly_earned.push(badge.clone());
  }
  (newly_earned, rows)
}

fn next_revision(expected: Option<u64>) -> u64 {
  expected.map_or(1, |r| r + 1)
}

// -------- Read models --------

#[derive(Clone, Debug, Serialize)]
pub struct AttemptOutcome {
  pub attempt: QuizAttempt,
  pub stats: UserStats,
  pub newly_earned: Vec<Badge>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatsSummary {
  pub stats: UserStats,
  pub overall_accuracy: f64,
  pub topic_progress: Vec<TopicProgress>,
  pub recent_attempts: Vec<QuizAttempt>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BadgeStatus {
  #[serde(flatten)]
  pub badge: Badge,
  pub progress: u8,
  pub earned_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BadgeOverview {
  pub earned: Vec<BadgeStatus>,
  pub available: Vec<BadgeStatus>,
  pub total_points: u32,
  pub level: u32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MasteryCell {
  pub mastered: bool,
  pub best_score: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TopicMastery {
  pub difficulties: BTreeMap<String, MasteryCell>,
  pub topic_mastered: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct LeaderboardEntry {
  pub user_id: UserId,
  pub total_points: u32,
  pub level: u32,
  pub total_quizzes: u32,
  pub current_streak: u32,
  pub badges_earned: usize,
}

// -------- Engine --------

pub struct ProgressEngine {
  store: Arc<dyn ProgressStore>,
  catalog: Vec<Badge>,
  locks: UserLocks,
}

impl ProgressEngine {
  pub fn new(store: Arc<dyn ProgressStore>, catalog: Vec<Badge>) -> Self {
    Self { store, catalog, locks: UserLocks::default() }
  }

  pub fn catalog(&self) -> &[Badge] {
    &self.catalog
  }

  /// Rebuild a user's aggregates by replaying attempts (oldest first) on an empty store.
  pub fn replay(catalog: Vec<Badge>, attempts: impl IntoIterator<Item = QuizAttempt>) -> Result<Self, QuizError> {
    let engine = Self::new(Arc::new(InMemoryStore::new()), catalog);
    for attempt in attempts {
      engine.record_attempt(attempt)?;
    }
    Ok(engine)
  }

  /// Run `work` under the user's lock, retrying the whole unit on commit conflicts.
  fn serialized<T>(&self, user_id: UserId, mut work: impl FnMut() -> Result<T, StoreError>) -> Result<T, QuizError> {
    let lock = self.locks.lock_for(user_id);
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

    let mut tries = 0;
    loop {
      tries += 1;
      match work() {
        Err(StoreError::Conflict { .. }) if tries < MAX_COMMIT_ATTEMPTS => {
          warn!(target: "progress", user_id, tries, "Commit conflict; retrying");
        }
        other => return other.map_err(QuizError::from),
      }
    }
  }

  /// Record a finished quiz and return the updated stats with newly earned badges.
  ///
  /// The level is recomputed from `total_points` before this call's badge
  /// awards are added, so points from badges earned now show up in the level
  /// on the next submission.
  #[instrument(
    level = "info",
    skip(self, attempt),
    fields(user_id = attempt.user_id, topic = %attempt.topic, difficulty = %attempt.difficulty, score = attempt.score, total = attempt.total_questions)
  )]
  pub fn record_attempt(&self, attempt: QuizAttempt) -> Result<AttemptOutcome, QuizError> {
    let outcome = self.serialized(attempt.user_id, || self.try_record(&attempt))?;
    info!(
      target: "progress",
      user_id = attempt.user_id,
      total_quizzes = outcome.stats.total_quizzes,
      streak = outcome.stats.current_streak_days,
      points = outcome.stats.total_points,
      new_badges = outcome.newly_earned.len(),
      "Attempt recorded"
    );
    Ok(outcome)
  }

  fn try_record(&self, attempt: &QuizAttempt) -> Result<AttemptOutcome, StoreError> {
    let user_id = attempt.user_id;
    let existing = self.store.load_stats(user_id)?;
    let expected_revision = existing.as_ref().map(|s| s.revision);
    let mut stats = existing.unwrap_or_else(|| UserStats::new(user_id, attempt.completed_at));

    apply_counters(&mut stats, attempt);
    let change = apply_streak(&mut stats, attempt.completed_on());
    debug!(target: "progress", user_id, ?change, streak = stats.current_streak_days, "Streak updated");
    stats.level = UserStats::level_for_points(stats.total_points);
    stats.updated_at = attempt.completed_at;

    let mut topic = self
      .store
      .load_topic(user_id, &attempt.topic, &attempt.difficulty)?
      .unwrap_or_else(|| TopicProgress::new(user_id, &attempt.topic, &attempt.difficulty));
    if apply_topic_attempt(&mut topic, attempt) {
      stats.topics_mastered = self.count_mastered(user_id, Some(&topic))?;
      info!(target: "progress", user_id, topic = %topic.topic, difficulty = %topic.difficulty, topics_mastered = stats.topics_mastered, "Topic mastered");
    }

    let facts = AttemptFacts {
      high_scores: self.store.count_attempts_at_least(user_id, HIGH_SCORE_PERCENTAGE)?
        + u32::from(attempt.percentage >= HIGH_SCORE_PERCENTAGE),
      best_percentage: self
        .store
        .best_attempt_percentage(user_id)?
        .map_or(attempt.percentage, |best| best.max(attempt.percentage)),
    };
    let earned = self.store.earned_badges(user_id)?;
    let (newly_earned, new_badges) = award_badges(&self.catalog, &earned, &mut stats, &facts, attempt.completed_at);

    stats.revision = next_revision(expected_revision);
    self.store.commit(ProgressUpdate {
      user_id,
      expected_revision,
      stats: stats.clone(),
      attempt: Some(attempt.clone()),
      topic: Some(topic),
      new_badges,
    })?;

    Ok(AttemptOutcome { attempt: attempt.clone(), stats, newly_earned })
  }

  /// Full recount of mastered topic rows; `pending` replaces its stored counterpart.
  fn count_mastered(&self, user_id: UserId, pending: Option<&TopicProgress>) -> Result<u32, StoreError> {
    let stored = self.store.topics_for_user(user_id)?;
    let replaced = |t: &TopicProgress| pending.is_some_and(|p| t.same_key(&p.topic, &p.difficulty));
    let mut count = stored.iter().filter(|t| t.is_mastered && !replaced(t)).count();
    if pending.is_some_and(|p| p.is_mastered) {
      count += 1;
    }
    Ok(count as u32)
  }

  fn attempt_facts(&self, user_id: UserId) -> Result<AttemptFacts, StoreError> {
    Ok(AttemptFacts {
      high_scores: self.store.count_attempts_at_least(user_id, HIGH_SCORE_PERCENTAGE)?,
      best_percentage: self.store.best_attempt_percentage(user_id)?.unwrap_or(0.0),
    })
  }

  /// Award any badge whose requirement is met by the stored state. Idempotent:
  /// with no new activity the second call returns nothing and writes nothing.
  #[instrument(level = "info", skip(self))]
  pub fn check_and_award_badges(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Vec<Badge>, QuizError> {
    self.serialized(user_id, || {
      let Some(mut stats) = self.store.load_stats(user_id)? else {
        return Ok(Vec::new());
      };
      let expected_revision = Some(stats.revision);
      let facts = self.attempt_facts(user_id)?;
      let earned = self.store.earned_badges(user_id)?;
      let (newly_earned, new_badges) = award_badges(&self.catalog, &earned, &mut stats, &facts, now);
      if new_badges.is_empty() {
        return Ok(newly_earned);
      }

      stats.revision = next_revision(expected_revision);
      stats.updated_at = now;
      self.store.commit(ProgressUpdate { user_id, expected_revision, stats, attempt: None, topic: None, new_badges })?;
      info!(target: "progress", user_id, awarded = newly_earned.len(), "Badges awarded outside a submission");
      Ok(newly_earned)
    })
  }

  /// Stored stats, or a fresh level-1 record for users with no history.
  pub fn stats(&self, user_id: UserId) -> Result<UserStats, QuizError> {
    Ok(self.store.load_stats(user_id)?.unwrap_or_else(|| UserStats::new(user_id, Utc::now())))
  }

  /// Every attempt, most recently recorded first. Reversed, this is the
  /// processing order `replay` needs, even when `completed_at` is not monotonic.
  pub fn attempt_history(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, QuizError> {
    let mut attempts = self.store.attempts_for_user(user_id)?;
    attempts.reverse();
    Ok(attempts)
  }

  #[instrument(level = "debug", skip(self))]
  pub fn stats_summary(&self, user_id: UserId, recent_limit: usize) -> Result<StatsSummary, QuizError> {
    let stats = self.stats(user_id)?;
    let mut recent_attempts = self.attempt_history(user_id)?;
    recent_attempts.truncate(recent_limit);
    Ok(StatsSummary {
      overall_accuracy: stats.overall_accuracy(),
      topic_progress: self.store.topics_for_user(user_id)?,
      recent_attempts,
      stats,
    })
  }

  /// Earned badges plus progress towards the rest.
  #[instrument(level = "debug", skip(self))]
  pub fn badge_overview(&self, user_id: UserId) -> Result<BadgeOverview, QuizError> {
    let stats = self.stats(user_id)?;
    let facts = self.attempt_facts(user_id)?;
    let earned_rows = self.store.earned_badges(user_id)?;

    let mut earned = Vec::new();
    let mut available = Vec::new();
    for badge in &self.catalog {
      match earned_rows.iter().find(|row| row.badge_name == badge.name) {
        Some(row) => earned.push(BadgeStatus { badge: badge.clone(), progress: 100, earned_at: Some(row.earned_at) }),
        None => available.push(BadgeStatus {
          badge: badge.clone(),
          progress: badge.requirement.progress(&stats, &facts),
          earned_at: None,
        }),
      }
    }
    Ok(BadgeOverview { earned, available, total_points: stats.total_points, level: stats.level })
  }

  /// Topic × difficulty grid of best scores. A cell counts as mastered above
  /// `OVERVIEW_MASTERY_PERCENT`; a topic when all three tiers are.
  pub fn mastery_overview(&self, user_id: UserId, topics: &[String]) -> Result<BTreeMap<String, TopicMastery>, QuizError> {
    let rows = self.store.topics_for_user(user_id)?;
    let mut out = BTreeMap::new();
    for topic in topics {
      let mut difficulties = BTreeMap::new();
      for tier in Tier::ALL {
        let best = rows
          .iter()
          .find(|r| r.same_key(topic, tier.as_str()))
          .map(|r| r.best_percentage)
          .unwrap_or(0.0);
        difficulties.insert(
          tier.as_str().to_string(),
          MasteryCell { mastered: best > OVERVIEW_MASTERY_PERCENT, best_score: round1(best) },
        );
      }
      let topic_mastered = difficulties.values().all(|c| c.mastered);
      out.insert(topic.clone(), TopicMastery { difficulties, topic_mastered });
    }
    Ok(out)
  }

  /// Rank the given users by points. Users without any stats are left out.
  pub fn leaderboard(&self, user_ids: &[UserId]) -> Result<Vec<LeaderboardEntry>, QuizError> {
    let mut entries = Vec::new();
    for &user_id in user_ids {
      let Some(stats) = self.store.load_stats(user_id)? else { continue };
      entries.push(LeaderboardEntry {
        user_id,
        total_points: stats.total_points,
        level: stats.level,
        total_quizzes: stats.total_quizzes,
        current_streak: stats.current_streak_days,
        badges_earned: self.store.earned_badges(user_id)?.len(),
      });
    }
    entries.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    Ok(entries)
  }
}
