//! WebSocket upgrade handler for tutoring sessions.
//!
//! Connection lifecycle:
//! 1. Validate learner and module ids from the request
//! 2. Upgrade to WebSocket
//! 3. Hand the connection to the session manager until disconnect

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocket, Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::transport::WebSocketTransport;
use crate::application::{SessionError, SessionManager};
use crate::domain::foundation::{ErrorCode, LearnerId, ModuleId, Timestamp};

/// Inbound frame cap used unless configured otherwise.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct TutorState {
    pub sessions: Arc<SessionManager>,
    pub max_message_bytes: usize,
}

impl TutorState {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    pub fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct TutorQuery {
    pub learner_id: String,
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "code": ErrorCode::ValidationFailed.as_str(),
            "message": message,
            "timestamp": Timestamp::now().to_rfc3339(),
        })),
    )
        .into_response()
}

/// Handle WebSocket upgrade requests for a tutoring session.
///
/// Route: `GET /api/modules/:module_id/tutor?learner_id=<id>`
pub async fn tutor_ws_handler(
    ws: WebSocketUpgrade,
    Path(module_id): Path<String>,
    Query(query): Query<TutorQuery>,
    State(state): State<TutorState>,
) -> Response {
    let module_id = match ModuleId::new(module_id) {
        Ok(id) => id,
        Err(e) => return bad_request(e.to_string()),
    };
    let learner_id = match LearnerId::new(query.learner_id) {
        Ok(id) => id,
        Err(e) => return bad_request(e.to_string()),
    };

    ws.max_message_size(state.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, learner_id, module_id, state))
}

async fn handle_socket(
    socket: WebSocket,
    learner_id: LearnerId,
    module_id: ModuleId,
    state: TutorState,
) {
    let mut transport = WebSocketTransport::new(socket);

    match state
        .sessions
        .handle_session(learner_id.clone(), module_id.clone(), &mut transport)
        .await
    {
        Ok(summary) => tracing::info!(
            learner_id = %learner_id,
            module_id = %module_id,
            exchanges = summary.exchanges,
            degraded_replies = summary.degraded_replies,
            cancelled = summary.cancelled,
            "Tutor session ended"
        ),
        Err(SessionError::ModuleNotFound(_)) => {}
        Err(err) => tracing::warn!(
            learner_id = %learner_id,
            module_id = %module_id,
            error = %err,
            "Tutor session ended with error"
        ),
    }

    transport.close().await;
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Create axum router for the tutor endpoints.
///
/// # Example
///
/// ```ignore
/// let app = tutor_router(TutorState::new(sessions)).layer(TraceLayer::new_for_http());
/// ```
pub fn tutor_router(state: TutorState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/modules/:module_id/tutor", get(tutor_ws_handler))
        .with_state(state)
}
