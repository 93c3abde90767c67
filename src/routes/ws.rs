//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug, warn};

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quiz_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quiz_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "quiz_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state)
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "quiz_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "quiz_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  let result = match msg {
    ClientWsMessage::Ping => return ServerWsMessage::Pong,

    ClientWsMessage::NewQuestion { tier } => new_question(state, tier.as_deref()).map(|question| {
      info!(target: "quiz_backend", tier = ?question.tier, "WS new_question served");
      ServerWsMessage::Question { question }
    }),

    ClientWsMessage::SubmitAttempt(input) => submit_attempt(state, input).map(|out| {
      info!(target: "quiz_backend", user_id = out.attempt.user_id, new_badges = out.new_badges.len(), "WS attempt recorded");
      ServerWsMessage::AttemptResult(out)
    }),

    ClientWsMessage::GetStats { user_id } => user_stats(state, user_id).map(|stats| ServerWsMessage::Stats { stats }),
  };

  result.unwrap_or_else(|e| {
    warn!(target: "quiz_backend", error = %e, "WS request failed");
    ServerWsMessage::Error { message: e.to_string() }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn send(state: &AppState, raw: &str) -> serde_json::Value {
    let msg: ClientWsMessage = serde_json::from_str(raw).unwrap();
    serde_json::to_value(handle_client_ws(msg, state)).unwrap()
  }

  #[test]
  fn ping_and_question_messages() {
    let state = AppState::default();
    assert_eq!(send(&state, r#"{"type":"ping"}"#)["type"], "pong");
    let q = send(&state, r#"{"type":"new_question","tier":"advanced"}"#);
    assert_eq!(q["type"], "question");
    assert_eq!(q["question"]["options"].as_array().unwrap().len(), 4);
    let bad = send(&state, r#"{"type":"new_question","tier":"wizard"}"#);
    assert_eq!(bad["type"], "error");
  }

  #[test]
  fn submit_then_get_stats() {
    let state = AppState::default();
    let r = send(
      &state,
      r#"{"type":"submit_attempt","userId":3,"topic":"sets","difficulty":"beginner","score":9,"totalQuestions":10}"#,
    );
    assert_eq!(r["type"], "attempt_result");
    assert_eq!(r["stats"]["total_quizzes"], 1);
    let s = send(&state, r#"{"type":"get_stats","userId":3}"#);
    assert_eq!(s["stats"]["total_correct_answers"], 9);
    assert_eq!(s["stats"]["overall_accuracy"], 90.0);
  }
}
