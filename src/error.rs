//! Error types for the persistence port and the quiz core.

use crate::domain::UserId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// Another writer committed first; the whole unit of work can be retried.
  #[error("concurrent update for user {user_id}; retry")]
  Conflict { user_id: UserId },
  #[error("store unavailable: {0}")]
  Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
  #[error("invalid attempt: {0}")]
  InvalidAttempt(String),
  #[error("invalid question count: {0}")]
  InvalidCount(String),
  #[error("unknown tier '{0}'")]
  UnknownTier(String),
  #[error("unsupported complex-number section '{0}'")]
  UnsupportedSection(String),
  #[error(transparent)]
  Store(#[from] StoreError),
}

impl QuizError {
  /// Input errors the caller can fix by changing the request.
  pub fn is_client_error(&self) -> bool {
    matches!(
      self,
      Self::InvalidAttempt(_) | Self::InvalidCount(_) | Self::UnknownTier(_) | Self::UnsupportedSection(_)
    )
  }

  pub fn is_conflict(&self) -> bool {
    matches!(self, Self::Store(StoreError::Conflict { .. }))
  }
}
