//! HTTP request handlers

use super::sse::chat_sse;
use super::types::{
    ChatRequest, ChatResponse, ConversationListResponse, ErrorResponse, HealthResponse,
    MessageListResponse, RootResponse,
};
use super::AppState;
use crate::chat::ChatError;
use crate::db::DbError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        .route("/api/conversations", get(list_conversations))
        .route(
            "/api/conversations/:id/messages",
            get(get_conversation_messages),
        )
        .with_state(state)
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Nightingale policy assistant API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let service = state
        .chat
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("No completion provider configured".to_string()))?;

    let outcome = service
        .chat(req.conversation_id.as_deref(), &req.content)
        .await
        .map_err(map_chat_error)?;

    Ok(Json(ChatResponse {
        response: outcome.response,
        conversation_id: outcome.conversation_id,
    }))
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let service = state
        .chat
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("No completion provider configured".to_string()))?;

    let (conversation_id, rx) = service
        .chat_stream(req.conversation_id.as_deref(), &req.content)
        .await
        .map_err(map_chat_error)?;

    Ok(chat_sse(conversation_id, rx).into_response())
}

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let conversations = state
        .db
        .list_conversations()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(ConversationListResponse { conversations }))
}

async fn get_conversation_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageListResponse>, AppError> {
    // 404 on unknown conversations rather than an empty list.
    state.db.get_conversation(&id).map_err(|e| match e {
        DbError::ConversationNotFound(id) => AppError::NotFound(format!("Conversation {id}")),
        other => AppError::Internal(other.to_string()),
    })?;

    let messages = state
        .db
        .get_messages(&id)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(MessageListResponse { messages }))
}

fn map_chat_error(e: ChatError) -> AppError {
    match e {
        ChatError::Graph(_) => AppError::Upstream(e.to_string()),
        other => AppError::Internal(other.to_string()),
    }
}

enum AppError {
    NotFound(String),
    Internal(String),
    /// Generation failed upstream; the turn can be retried.
    Upstream(String),
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
