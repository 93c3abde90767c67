//! Built-in content: the default badge catalog and the topic list.
//! Both can be overridden from the TOML config.

use crate::domain::{Badge, Requirement};

/// Topics known to the mastery overview when the config does not list any.
pub const DEFAULT_TOPICS: [&str; 10] = [
  "arithmetic",
  "fractions",
  "decimals",
  "multiplication_division",
  "bodmas",
  "functions",
  "sets",
  "probability",
  "complex_numbers_intro",
  "complex_numbers_expanded",
];

fn badge(name: &str, description: &str, icon: &str, category: &str, requirement: Requirement, points: u32, color: &str) -> Badge {
  Badge {
    name: name.into(),
    description: description.into(),
    icon: icon.into(),
    category: category.into(),
    requirement,
    points,
    color: color.into(),
  }
}

/// The 15 default badges.
pub fn default_badges() -> Vec<Badge> {
  use Requirement::*;
  vec![
    // Getting started
    badge("First Steps", "Complete your first quiz", "fa-star", "beginner", QuizzesCompleted(1), 10, "yellow"),
    badge("Curious Learner", "Complete 5 quizzes", "fa-book", "beginner", QuizzesCompleted(5), 20, "blue"),
    badge("Dedicated Student", "Complete 10 quizzes", "fa-graduation-cap", "progress", QuizzesCompleted(10), 30, "purple"),
    badge("Math Enthusiast", "Complete 25 quizzes", "fa-heart", "progress", QuizzesCompleted(25), 50, "red"),
    badge("Quiz Master", "Complete 50 quizzes", "fa-trophy", "progress", QuizzesCompleted(50), 100, "gold"),
    // Accuracy
    badge("Sharp Shooter", "Get 80%+ on any quiz", "fa-bullseye", "accuracy", QuizPercentage(80), 15, "orange"),
    badge("Perfectionist", "Get 100% on any quiz", "fa-crown", "accuracy", PerfectScores(1), 25, "gold"),
    badge("Consistent Excellence", "Get 90%+ on 5 quizzes", "fa-medal", "accuracy", HighScores(5), 50, "silver"),
    badge("Flawless Five", "Get 100% on 5 quizzes", "fa-gem", "accuracy", PerfectScores(5), 100, "diamond"),
    // Streaks
    badge("Daily Habit", "Practice 3 days in a row", "fa-fire", "streak", StreakDays(3), 20, "orange"),
    badge("Week Warrior", "Practice 7 days in a row", "fa-bolt", "streak", StreakDays(7), 40, "yellow"),
    badge("Unstoppable", "Practice 14 days in a row", "fa-rocket", "streak", StreakDays(14), 75, "red"),
    // Mastery
    badge("Topic Master", "Master any topic", "fa-certificate", "mastery", TopicsMastered(1), 30, "green"),
    badge("Subject Expert", "Master 3 different topics", "fa-brain", "mastery", TopicsMastered(3), 75, "purple"),
    badge("Mathematics Genius", "Master 5 different topics", "fa-infinity", "mastery", TopicsMastered(5), 150, "rainbow"),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn badge_names_are_unique() {
    let badges = default_badges();
    let names: HashSet<_> = badges.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names.len(), badges.len());
    assert_eq!(badges.len(), 15);
  }
}
