//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Inputs use camelCase field names; outputs mirror the domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Badge, QuizAttempt, UserId, UserStats};
use crate::error::QuizError;
use crate::questions::GeneratedQuestion;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewQuestion {
        #[serde(default)]
        tier: Option<String>,
    },
    SubmitAttempt(AttemptIn),
    GetStats {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Question {
        question: GeneratedQuestion,
    },
    AttemptResult(AttemptOut),
    Stats {
        stats: StatsOut,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    pub tier: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuizQuery {
    pub tier: Option<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ComplexQuery {
    pub section: Option<String>,
}

#[derive(Serialize)]
pub struct QuizOut {
    pub tier: String,
    pub questions: Vec<GeneratedQuestion>,
}

/// A finished quiz as submitted by the client. The completion time is always
/// stamped by the server, so clients cannot choose the streak day.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptIn {
    pub user_id: UserId,
    pub topic: String,
    pub difficulty: String,
    pub score: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub time_taken: Option<u32>,
}

impl AttemptIn {
    /// Validate and turn into a domain attempt completed at `now`. The
    /// percentage is always recomputed from `score / totalQuestions`.
    pub fn into_attempt(self, now: DateTime<Utc>, max_questions: u32) -> Result<QuizAttempt, QuizError> {
        if self.topic.trim().is_empty() {
            return Err(QuizError::InvalidAttempt("topic must not be empty".into()));
        }
        if self.difficulty.trim().is_empty() {
            return Err(QuizError::InvalidAttempt("difficulty must not be empty".into()));
        }
        if self.total_questions == 0 {
            return Err(QuizError::InvalidAttempt("totalQuestions must be positive".into()));
        }
        if self.total_questions > max_questions {
            return Err(QuizError::InvalidAttempt(format!(
                "totalQuestions {} exceeds the maximum of {}",
                self.total_questions, max_questions
            )));
        }
        if self.score > self.total_questions {
            return Err(QuizError::InvalidAttempt(format!(
                "score {} exceeds totalQuestions {}",
                self.score, self.total_questions
            )));
        }
        Ok(QuizAttempt::new(
            self.user_id,
            self.topic.trim(),
            self.difficulty.trim(),
            self.score,
            self.total_questions,
            self.time_taken,
            now,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct StatsOut {
    #[serde(flatten)]
    pub stats: UserStats,
    pub overall_accuracy: f64,
}

impl From<UserStats> for StatsOut {
    fn from(stats: UserStats) -> Self {
        Self { overall_accuracy: stats.overall_accuracy(), stats }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptOut {
    pub attempt: QuizAttempt,
    pub stats: StatsOut,
    pub new_badges: Vec<Badge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardIn {
    pub user_ids: Vec<UserId>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    const MAX: u32 = 100;

    #[test]
    fn submit_attempt_message_parses_camel_case() {
        let raw = r#"{"type":"submit_attempt","userId":7,"topic":"fractions","difficulty":"beginner","score":8,"totalQuestions":10}"#;
        let ClientWsMessage::SubmitAttempt(input) = serde_json::from_str(raw).unwrap() else {
            panic!("wrong variant");
        };
        let attempt = input.into_attempt(now(), MAX).unwrap();
        assert_eq!(attempt.user_id, 7);
        assert_eq!(attempt.percentage, 80.0);
        assert_eq!(attempt.completed_at, now());
    }

    #[test]
    fn invalid_attempts_are_rejected() {
        let base = AttemptIn {
            user_id: 1,
            topic: "sets".into(),
            difficulty: "beginner".into(),
            score: 3,
            total_questions: 0,
            time_taken: None,
        };
        assert!(matches!(base.clone().into_attempt(now(), MAX), Err(QuizError::InvalidAttempt(_))));
        let over = AttemptIn { score: 11, total_questions: 10, ..base.clone() };
        assert!(over.into_attempt(now(), MAX).is_err());
        let blank = AttemptIn { topic: "  ".into(), total_questions: 10, ..base.clone() };
        assert!(blank.into_attempt(now(), MAX).unwrap_err().is_client_error());
        let huge = AttemptIn { score: 0, total_questions: u32::MAX, ..base.clone() };
        assert!(matches!(huge.into_attempt(now(), MAX), Err(QuizError::InvalidAttempt(_))));
        let at_limit = AttemptIn { score: MAX, total_questions: MAX, ..base };
        assert_eq!(at_limit.into_attempt(now(), MAX).unwrap().percentage, 100.0);
    }

    #[test]
    fn client_timestamps_are_ignored() {
        let raw = r#"{"userId":7,"topic":"sets","difficulty":"beginner","score":5,"totalQuestions":10,"completedAt":"2099-01-01T00:00:00Z"}"#;
        let input: AttemptIn = serde_json::from_str(raw).unwrap();
        assert_eq!(input.into_attempt(now(), MAX).unwrap().completed_at, now());
    }

    #[test]
    fn server_messages_are_tagged() {
        let json = serde_json::to_value(ServerWsMessage::Error { message: "nope".into() }).unwrap();
        assert_eq!(json["type"], "error");
        let json = serde_json::to_value(ServerWsMessage::Pong).unwrap();
        assert_eq!(json["type"], "pong");
    }
}
