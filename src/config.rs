//! Loading quiz configuration (generator settings, topic list, badge catalog) from TOML.
//!
//! Example:
//!
//! ```toml
//! topics = ["fractions", "multiplication_division"]
//!
//! [quiz]
//! option_count = 4
//! quiz_length = 10
//! max_quiz_length = 50
//! max_questions = 100
//! recent_attempts = 10
//!
//! [[badges]]
//! name = "First Steps"
//! description = "Complete your first quiz"
//! requirement_type = "quizzes_completed"
//! requirement_value = 1
//! points = 10
//! ```

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{Badge, Requirement};
use crate::seeds::{default_badges, DEFAULT_TOPICS};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub quiz: QuizSettings,
  #[serde(default)]
  pub topics: Vec<String>,
  #[serde(default)]
  pub badges: Vec<BadgeCfg>,
}

/// Generator and read-model knobs.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
  pub option_count: usize,
  pub quiz_length: usize,
  /// Largest `count` a quiz request may ask for.
  pub max_quiz_length: usize,
  /// Largest `totalQuestions` a submitted attempt may carry.
  pub max_questions: u32,
  pub recent_attempts: usize,
}

impl Default for QuizSettings {
  fn default() -> Self {
    Self { option_count: 4, quiz_length: 10, max_quiz_length: 50, max_questions: 100, recent_attempts: 10 }
  }
}

/// Badge entry accepted in TOML configuration. The requirement is flat
/// (`requirement_type` + `requirement_value`) like a catalog table row.
#[derive(Clone, Debug, Deserialize)]
pub struct BadgeCfg {
  pub name: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub icon: String,
  #[serde(default)] pub category: String,
  pub requirement_type: String,
  pub requirement_value: u32,
  #[serde(default)] pub points: u32,
  #[serde(default)] pub color: String,
}

impl BadgeCfg {
  pub fn to_badge(&self) -> Option<Badge> {
    let requirement = Requirement::from_parts(&self.requirement_type, self.requirement_value)?;
    Some(Badge {
      name: self.name.clone(),
      description: self.description.clone(),
      icon: self.icon.clone(),
      category: self.category.clone(),
      requirement,
      points: self.points,
      color: self.color.clone(),
    })
  }
}

impl AppConfig {
  /// Configured badge catalog, or the built-in one when none is configured.
  /// Entries with an unknown requirement type are skipped; duplicate names keep the first.
  pub fn badge_catalog(&self) -> Vec<Badge> {
    if self.badges.is_empty() {
      return default_badges();
    }
    let mut out: Vec<Badge> = Vec::with_capacity(self.badges.len());
    for cfg in &self.badges {
      match cfg.to_badge() {
        Some(b) if out.iter().any(|o| o.name == b.name) => {
          warn!(target: "quiz_backend", name = %b.name, "Duplicate badge name in config; keeping the first.");
        }
        Some(b) => out.push(b),
        None => {
          error!(target: "quiz_backend", name = %cfg.name, kind = %cfg.requirement_type, "Skipping badge: unknown requirement type.");
        }
      }
    }
    out
  }

  pub fn topic_list(&self) -> Vec<String> {
    if self.topics.is_empty() {
      DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
    } else {
      self.topics.clone()
    }
  }
}

/// Attempt to load `AppConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quiz_backend", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quiz_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quiz_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg: AppConfig = toml::from_str("").unwrap();
    assert_eq!(cfg.quiz.option_count, 4);
    assert_eq!(cfg.quiz.quiz_length, 10);
    assert_eq!(cfg.quiz.max_quiz_length, 50);
    assert_eq!(cfg.quiz.max_questions, 100);
    assert_eq!(cfg.badge_catalog().len(), 15);
    assert_eq!(cfg.topic_list().len(), DEFAULT_TOPICS.len());
  }

  #[test]
  fn partial_quiz_section_keeps_other_defaults() {
    let cfg: AppConfig = toml::from_str("topics = [\"sets\"]\n[quiz]\nquiz_length = 5\n").unwrap();
    assert_eq!(cfg.quiz.quiz_length, 5);
    assert_eq!(cfg.quiz.option_count, 4);
    assert_eq!(cfg.topic_list(), vec!["sets".to_string()]);
  }

  #[test]
  fn badge_overrides_skip_unknown_kinds() {
    let toml = r#"
      [[badges]]
      name = "Starter"
      requirement_type = "quizzes_completed"
      requirement_value = 2
      points = 5

      [[badges]]
      name = "Night Owl"
      requirement_type = "late_night_quizzes"
      requirement_value = 3

      [[badges]]
      name = "Starter"
      requirement_type = "streak_days"
      requirement_value = 9
    "#;
    let cfg: AppConfig = toml::from_str(toml).unwrap();
    let catalog = cfg.badge_catalog();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].requirement, Requirement::QuizzesCompleted(2));
    assert_eq!(catalog[0].points, 5);
  }
}
