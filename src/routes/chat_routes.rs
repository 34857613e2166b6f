use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::{
    error::ApiError,
    llm::{ChatReply, ChatTurn},
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
};

const SENDER_USER: i16 = 0;
const SENDER_ASSISTANT: i16 = 1;

const MAX_MESSAGE_CHARS: usize = 2000;

pub fn router() -> Router<AppState> {
    Router::new().route("/chat/messages", post(send_message))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatExchangeDto {
    pub intent: String,
    pub reply: String,
}

/// One chat exchange: evict stale history for this session, replay the
/// bounded window to the LLM together with the new message, persist both
/// turns. History is keyed by session token, so a new login starts clean.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiOk<ChatExchangeDto>>, ApiError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "message is required".into(),
        ));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("message may not exceed {MAX_MESSAGE_CHARS} characters"),
        ));
    }

    // TTL eviction keeps the per-session history from growing unbounded.
    sqlx::query(
        r#"
        DELETE FROM chat_message
        WHERE session_token_id = $1
          AND created_at < now() - ($2 * interval '1 minute')
        "#,
    )
    .bind(auth.session_token_id)
    .bind(state.chat_history_ttl_minutes as f64)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    // Most recent window, oldest first for the prompt.
    let rows = sqlx::query(
        r#"
        SELECT sender, content
        FROM chat_message
        WHERE session_token_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth.session_token_id)
    .bind(state.chat_history_limit)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let mut history: Vec<ChatTurn> = rows
        .into_iter()
        .map(|r| {
            let sender: i16 = r.try_get("sender")?;
            let content: String = r.try_get("content")?;
            Ok(ChatTurn {
                role: if sender == SENDER_ASSISTANT {
                    "assistant"
                } else {
                    "user"
                },
                content,
            })
        })
        .collect::<Result<_, sqlx::Error>>()
        .map_err(|e| ApiError::Internal(format!("row decode error: {e}")))?;
    history.reverse();

    sqlx::query(
        r#"
        INSERT INTO chat_message (session_token_id, sender, content)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(auth.session_token_id)
    .bind(SENDER_USER)
    .bind(message)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let ChatReply { intent, reply } =
        state.chat.reply(&history, message).await.map_err(|e| {
            tracing::warn!(error = %e, "llm call failed");
            ApiError::BadGateway("LLM_UNAVAILABLE", "Assistant is unavailable, try again".into())
        })?;

    sqlx::query(
        r#"
        INSERT INTO chat_message (session_token_id, sender, content, intent)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(auth.session_token_id)
    .bind(SENDER_ASSISTANT)
    .bind(&reply)
    .bind(&intent)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk {
        data: ChatExchangeDto { intent, reply },
    }))
}
