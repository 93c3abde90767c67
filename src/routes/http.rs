//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::domain::UserId;
use crate::error::QuizError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

/// `QuizError` rendered as `{ "error": ... }` with a matching status code.
pub struct ApiError(pub QuizError);

impl From<QuizError> for ApiError {
  fn from(e: QuizError) -> Self {
    Self(e)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = if self.0.is_client_error() {
      StatusCode::BAD_REQUEST
    } else if self.0.is_conflict() {
      StatusCode::CONFLICT
    } else {
      StatusCode::INTERNAL_SERVER_ERROR
    };
    if status.is_server_error() {
      error!(target: "quiz_backend", error = %self.0, "Request failed");
    } else {
      warn!(target: "quiz_backend", %status, error = %self.0, "Request rejected");
    }
    (status, Json(ErrorOut { error: self.0.to_string() })).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_question(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuestionQuery>,
) -> ApiResult<crate::questions::GeneratedQuestion> {
  let question = new_question(&state, q.tier.as_deref())?;
  info!(target: "quiz_backend", tier = ?question.tier, "HTTP question served");
  Ok(Json(question))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuizQuery>,
) -> ApiResult<QuizOut> {
  Ok(Json(new_quiz(&state, q.tier.as_deref(), q.count)?))
}

#[instrument(level = "info")]
pub async fn http_get_complex(Query(q): Query<ComplexQuery>) -> ApiResult<crate::complex::ChoiceQuestion> {
  Ok(Json(new_complex_question(q.section.as_deref())?))
}

#[instrument(level = "info", skip(state, body), fields(user_id = body.user_id, topic = %body.topic, score = body.score, total = body.total_questions))]
pub async fn http_post_attempt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AttemptIn>,
) -> Result<(StatusCode, Json<AttemptOut>), ApiError> {
  let out = submit_attempt(&state, body)?;
  info!(target: "quiz_backend", user_id = out.attempt.user_id, new_badges = out.new_badges.len(), "HTTP attempt recorded");
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_stats(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<UserId>,
) -> ApiResult<crate::progress::StatsSummary> {
  Ok(Json(state.engine.stats_summary(user_id, state.settings.recent_attempts)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_badges(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<UserId>,
) -> ApiResult<crate::progress::BadgeOverview> {
  Ok(Json(state.engine.badge_overview(user_id)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_check_badges(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<UserId>,
) -> ApiResult<Vec<crate::domain::Badge>> {
  let awarded = state.engine.check_and_award_badges(user_id, Utc::now())?;
  info!(target: "quiz_backend", user_id, awarded = awarded.len(), "HTTP badge check");
  Ok(Json(awarded))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_mastery(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<UserId>,
) -> ApiResult<std::collections::BTreeMap<String, crate::progress::TopicMastery>> {
  Ok(Json(state.engine.mastery_overview(user_id, &state.topics)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_attempts(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<UserId>,
) -> ApiResult<Vec<crate::domain::QuizAttempt>> {
  Ok(Json(state.engine.attempt_history(user_id)?))
}

#[instrument(level = "info", skip(state, body), fields(users = body.user_ids.len()))]
pub async fn http_post_leaderboard(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LeaderboardIn>,
) -> ApiResult<Vec<crate::progress::LeaderboardEntry>> {
  Ok(Json(state.engine.leaderboard(&body.user_ids)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.engine.catalog().to_vec())
}
