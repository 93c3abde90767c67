//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Parsing of tier/section parameters, question generation with the process
//! RNG, and attempt submission through the progress engine.

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::complex::{generate_complex_question, ChoiceQuestion, Section};
use crate::domain::{Tier, UserId};
use crate::error::QuizError;
use crate::protocol::{AttemptIn, AttemptOut, QuizOut, StatsOut};
use crate::questions::{generate_question_with, generate_quiz, GeneratedQuestion};
use crate::state::AppState;

const DEFAULT_TIER: Tier = Tier::Beginner;
/// Every section of the complex-number course; only the first two have generators.
const KNOWN_SECTIONS: [&str; 5] = ["section1", "section2", "section3", "section4", "section5"];

pub fn parse_tier(raw: Option<&str>) -> Result<Tier, QuizError> {
  match raw {
    None => Ok(DEFAULT_TIER),
    Some(s) => Tier::from_str(s).ok_or_else(|| QuizError::UnknownTier(s.to_string())),
  }
}

pub fn parse_section(raw: Option<&str>) -> Result<Section, QuizError> {
  let s = raw.unwrap_or("section1");
  match Section::from_str(s) {
    Some(section) => Ok(section),
    None if KNOWN_SECTIONS.contains(&s.trim().to_ascii_lowercase().as_str()) => {
      Err(QuizError::UnsupportedSection(s.to_string()))
    }
    None => Err(QuizError::UnsupportedSection(format!("{} (expected section1..section5)", s))),
  }
}

#[instrument(level = "info", skip(state))]
pub fn new_question(state: &AppState, tier: Option<&str>) -> Result<GeneratedQuestion, QuizError> {
  let tier = parse_tier(tier)?;
  let q = generate_question_with(tier, state.settings.option_count, &mut rand::thread_rng());
  debug!(target: "quiz_backend", tier = tier.as_str(), text = %q.question_text, "Question generated");
  Ok(q)
}

#[instrument(level = "info", skip(state))]
pub fn new_quiz(state: &AppState, tier: Option<&str>, count: Option<usize>) -> Result<QuizOut, QuizError> {
  let tier = parse_tier(tier)?;
  let count = count.unwrap_or(state.settings.quiz_length);
  if count == 0 || count > state.settings.max_quiz_length {
    return Err(QuizError::InvalidCount(format!(
      "count must be between 1 and {}, got {}",
      state.settings.max_quiz_length, count
    )));
  }
  let questions = generate_quiz(tier, count, state.settings.option_count, &mut rand::thread_rng());
  info!(target: "quiz_backend", tier = tier.as_str(), count = questions.len(), "Quiz generated");
  Ok(QuizOut { tier: tier.as_str().to_string(), questions })
}

#[instrument(level = "info")]
pub fn new_complex_question(section: Option<&str>) -> Result<ChoiceQuestion, QuizError> {
  let section = parse_section(section)?;
  Ok(generate_complex_question(section, &mut rand::thread_rng()))
}

#[instrument(level = "info", skip(state, input), fields(user_id = input.user_id, topic = %input.topic))]
pub fn submit_attempt(state: &AppState, input: AttemptIn) -> Result<AttemptOut, QuizError> {
  let attempt = input.into_attempt(Utc::now(), state.settings.max_questions)?;
  let outcome = state.engine.record_attempt(attempt)?;
  Ok(AttemptOut {
    attempt: outcome.attempt,
    stats: outcome.stats.into(),
    new_badges: outcome.newly_earned,
  })
}

pub fn user_stats(state: &AppState, user_id: UserId) -> Result<StatsOut, QuizError> {
  Ok(state.engine.stats(user_id)?.into())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tiers_default_to_beginner_and_reject_unknown() {
    assert_eq!(parse_tier(None).unwrap(), Tier::Beginner);
    assert_eq!(parse_tier(Some("ADVANCED")).unwrap(), Tier::Advanced);
    assert!(matches!(parse_tier(Some("expert")), Err(QuizError::UnknownTier(_))));
  }

  #[test]
  fn later_sections_are_unsupported() {
    assert_eq!(parse_section(None).unwrap(), Section::Section1);
    assert!(matches!(parse_section(Some("section4")), Err(QuizError::UnsupportedSection(_))));
    assert!(parse_section(Some("chapter9")).unwrap_err().is_client_error());
  }

  #[test]
  fn quiz_uses_configured_length() {
    let state = AppState::default();
    let quiz = new_quiz(&state, Some("intermediate"), None).unwrap();
    assert_eq!(quiz.questions.len(), state.settings.quiz_length);
    assert!(quiz.questions.iter().all(|q| q.options.len() == state.settings.option_count));
  }

  #[test]
  fn quiz_count_is_bounded() {
    let state = AppState::default();
    let max = state.settings.max_quiz_length;
    assert_eq!(new_quiz(&state, None, Some(max)).unwrap().questions.len(), max);
    assert!(matches!(new_quiz(&state, None, Some(max + 1)), Err(QuizError::InvalidCount(_))));
    assert!(matches!(new_quiz(&state, None, Some(0)), Err(QuizError::InvalidCount(_))));
  }

  #[test]
  fn submit_attempt_updates_stats() {
    let state = AppState::default();
    let input = AttemptIn {
      user_id: 5,
      topic: "fractions".into(),
      difficulty: "beginner".into(),
      score: 10,
      total_questions: 10,
      time_taken: Some(90),
    };
    let out = submit_attempt(&state, input).unwrap();
    assert_eq!(out.stats.stats.total_quizzes, 1);
    assert_eq!(out.stats.overall_accuracy, 100.0);
    assert!(out.new_badges.iter().any(|b| b.name == "Perfectionist"));
    assert_eq!(user_stats(&state, 5).unwrap().stats.perfect_scores, 1);
  }
}
