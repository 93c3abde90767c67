//! Application state: the progress engine over its store, quiz settings and the topic list.
//!
//! Built once at startup from `QUIZ_CONFIG_PATH` (or defaults) and shared
//! behind an `Arc` by every HTTP and WebSocket handler.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_config_from_env, AppConfig, QuizSettings};
use crate::progress::ProgressEngine;
use crate::store::{InMemoryStore, ProgressStore};

pub struct AppState {
  pub engine: ProgressEngine,
  pub settings: QuizSettings,
  pub topics: Vec<String>,
}

impl AppState {
  /// Build state from env: load config, pick the badge catalog, open the in-memory store.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let cfg = load_config_from_env().unwrap_or_else(|| {
      info!(target: "quiz_backend", "No QUIZ_CONFIG_PATH config; using built-in settings and badges.");
      AppConfig::default()
    });
    Self::with_config(cfg, Arc::new(InMemoryStore::new()))
  }

  pub fn with_config(cfg: AppConfig, store: Arc<dyn ProgressStore>) -> Self {
    let catalog = cfg.badge_catalog();

    // Inventory summary by badge category.
    let mut by_category: HashMap<&str, (usize, u32)> = HashMap::new();
    for b in &catalog {
      let entry = by_category.entry(b.category.as_str()).or_insert((0, 0));
      entry.0 += 1;
      entry.1 += b.points;
    }
    for (category, (count, points)) in by_category {
      info!(target: "quiz_backend", %category, count, points, "Startup badge inventory");
    }
    info!(
      target: "quiz_backend",
      topics = cfg.topic_list().len(),
      option_count = cfg.quiz.option_count,
      quiz_length = cfg.quiz.quiz_length,
      "Quiz settings"
    );

    Self {
      engine: ProgressEngine::new(store, catalog),
      topics: cfg.topic_list(),
      settings: cfg.quiz,
    }
  }
}

impl Default for AppState {
  fn default() -> Self {
    Self::with_config(AppConfig::default(), Arc::new(InMemoryStore::new()))
  }
}
