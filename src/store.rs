//! Persistence port for the progress engine, plus the in-memory adapter.
//!
//! The engine never talks to a database directly: it reads through
//! `ProgressStore` and writes every mutation of one submission as a single
//! `ProgressUpdate`, so an adapter can commit it in one transaction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::warn;

use crate::domain::{QuizAttempt, TopicProgress, UserBadge, UserId, UserStats};
use crate::error::StoreError;

/// Everything one unit of work changes for a user.
#[derive(Clone, Debug)]
pub struct ProgressUpdate {
  pub user_id: UserId,
  /// Revision of the stats row the update was computed from; `None` if it did not exist.
  pub expected_revision: Option<u64>,
  pub stats: UserStats,
  pub attempt: Option<QuizAttempt>,
  pub topic: Option<TopicProgress>,
  pub new_badges: Vec<UserBadge>,
}

pub trait ProgressStore: Send + Sync {
  fn load_stats(&self, user_id: UserId) -> Result<Option<UserStats>, StoreError>;
  fn load_topic(&self, user_id: UserId, topic: &str, difficulty: &str) -> Result<Option<TopicProgress>, StoreError>;
  fn topics_for_user(&self, user_id: UserId) -> Result<Vec<TopicProgress>, StoreError>;
  fn earned_badges(&self, user_id: UserId) -> Result<Vec<UserBadge>, StoreError>;
  /// Oldest first.
  fn attempts_for_user(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StoreError>;
  fn count_attempts_at_least(&self, user_id: UserId, percentage: f64) -> Result<u32, StoreError>;
  fn best_attempt_percentage(&self, user_id: UserId) -> Result<Option<f64>, StoreError>;
  /// Apply the update atomically, or fail with `StoreError::Conflict` when the
  /// stored stats revision no longer matches `expected_revision`.
  fn commit(&self, update: ProgressUpdate) -> Result<(), StoreError>;
}

#[derive(Default)]
struct Tables {
  stats: HashMap<UserId, UserStats>,
  topics: HashMap<(UserId, String, String), TopicProgress>,
  badges: HashMap<UserId, Vec<UserBadge>>,
  attempts: HashMap<UserId, Vec<QuizAttempt>>,
}

/// Process-local store. One `RwLock` over all tables makes `commit` atomic.
#[derive(Default)]
pub struct InMemoryStore {
  tables: RwLock<Tables>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
  StoreError::Unavailable("in-memory store lock poisoned".into())
}

impl ProgressStore for InMemoryStore {
  fn load_stats(&self, user_id: UserId) -> Result<Option<UserStats>, StoreError> {
    let t = self.tables.read().map_err(poisoned)?;
    Ok(t.stats.get(&user_id).cloned())
  }

  fn load_topic(&self, user_id: UserId, topic: &str, difficulty: &str) -> Result<Option<TopicProgress>, StoreError> {
    let t = self.tables.read().map_err(poisoned)?;
    Ok(t.topics.get(&(user_id, topic.to_string(), difficulty.to_string())).cloned())
  }

  fn topics_for_user(&self, user_id: UserId) -> Result<Vec<TopicProgress>, StoreError> {
    let t = self.tables.read().map_err(poisoned)?;
    let mut rows: Vec<TopicProgress> = t.topics.values().filter(|p| p.user_id == user_id).cloned().collect();
    rows.sort_by(|a, b| (&a.topic, &a.difficulty).cmp(&(&b.topic, &b.difficulty)));
    Ok(rows)
  }

  fn earned_badges(&self, user_id: UserId) -> Result<Vec<UserBadge>, StoreError> {
    let t = self.tables.read().map_err(poisoned)?;
    Ok(t.badges.get(&user_id).cloned().unwrap_or_default())
  }

  fn attempts_for_user(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StoreError> {
    let t = self.tables.read().map_err(poisoned)?;
    Ok(t.attempts.get(&user_id).cloned().unwrap_or_default())
  }

  fn count_attempts_at_least(&self, user_id: UserId, percentage: f64) -> Result<u32, StoreError> {
    let t = self.tables.read().map_err(poisoned)?;
    let n = t
      .attempts
      .get(&user_id)
      .map(|list| list.iter().filter(|a| a.percentage >= percentage).count())
      .unwrap_or(0);
    Ok(n as u32)
  }

  fn best_attempt_percentage(&self, user_id: UserId) -> Result<Option<f64>, StoreError> {
    let t = self.tables.read().map_err(poisoned)?;
    Ok(t.attempts.get(&user_id).and_then(|list| list.iter().map(|a| a.percentage).reduce(f64::max)))
  }

  fn commit(&self, update: ProgressUpdate) -> Result<(), StoreError> {
    let mut t = self.tables.write().map_err(poisoned)?;
    let user_id = update.user_id;

    let stored = t.stats.get(&user_id).map(|s| s.revision);
    if stored != update.expected_revision {
      warn!(target: "progress", user_id, ?stored, expected = ?update.expected_revision, "Stale stats revision; rejecting commit");
      return Err(StoreError::Conflict { user_id });
    }

    t.stats.insert(user_id, update.stats);
    if let Some(attempt) = update.attempt {
      t.attempts.entry(user_id).or_default().push(attempt);
    }
    if let Some(topic) = update.topic {
      t.topics.insert((user_id, topic.topic.clone(), topic.difficulty.clone()), topic);
    }
    let earned = t.badges.entry(user_id).or_default();
    for badge in update.new_badges {
      // (user, badge) is unique
      if !earned.iter().any(|b| b.badge_name == badge.badge_name) {
        earned.push(badge);
      }
    }
    Ok(())
  }
}

/// One mutex per user so submissions from the same user run one at a time.
#[derive(Default)]
pub struct UserLocks {
  locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
  pub fn lock_for(&self, user_id: UserId) -> Arc<Mutex<()>> {
    let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    map.entry(user_id).or_default().clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};

  fn update(user_id: UserId, expected: Option<u64>, revision: u64) -> ProgressUpdate {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut stats = UserStats::new(user_id, now);
    stats.revision = revision;
    ProgressUpdate { user_id, expected_revision: expected, stats, attempt: None, topic: None, new_badges: vec![] }
  }

  #[test]
  fn stale_revision_is_a_conflict() {
    let store = InMemoryStore::new();
    store.commit(update(1, None, 1)).unwrap();
    // Second writer computed from "no row" as well.
    let err = store.commit(update(1, None, 1)).unwrap_err();
    assert!(matches!(err, StoreError::Conflict { user_id: 1 }));
    store.commit(update(1, Some(1), 2)).unwrap();
    assert_eq!(store.load_stats(1).unwrap().unwrap().revision, 2);
  }

  #[test]
  fn badges_are_never_duplicated() {
    let store = InMemoryStore::new();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let badge = UserBadge { user_id: 1, badge_name: "First Steps".into(), earned_at: now, progress: 100 };
    let mut first = update(1, None, 1);
    first.new_badges = vec![badge.clone(), badge.clone()];
    store.commit(first).unwrap();
    let mut second = update(1, Some(1), 2);
    second.new_badges = vec![badge];
    store.commit(second).unwrap();
    assert_eq!(store.earned_badges(1).unwrap().len(), 1);
  }

  #[test]
  fn attempt_queries_filter_by_percentage() {
    let store = InMemoryStore::new();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut rev = None;
    for (i, score) in [10u32, 9, 5].into_iter().enumerate() {
      let mut u = update(3, rev, i as u64 + 1);
      u.attempt = Some(QuizAttempt::new(3, "sets", "beginner", score, 10, None, now));
      store.commit(u).unwrap();
      rev = Some(i as u64 + 1);
    }
    assert_eq!(store.count_attempts_at_least(3, 90.0).unwrap(), 2);
    assert_eq!(store.best_attempt_percentage(3).unwrap(), Some(100.0));
    assert_eq!(store.best_attempt_percentage(4).unwrap(), None);
    assert_eq!(store.attempts_for_user(3).unwrap().len(), 3);
  }

  #[test]
  fn user_locks_are_shared_per_user() {
    let locks = UserLocks::default();
    assert!(Arc::ptr_eq(&locks.lock_for(1), &locks.lock_for(1)));
    assert!(!Arc::ptr_eq(&locks.lock_for(1), &locks.lock_for(2)));
  }
}
