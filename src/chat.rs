//! Chat turn orchestration
//!
//! Wires persistence, identity, and the conversation graph together for
//! one user message. The user message is always recorded before the
//! external call, so a failed turn leaves the conversation retryable.

use crate::db::{Database, MessageRole};
use crate::graph::{plan_turn, ConversationGraph, GraphError, TurnPlan};
use crate::identity::{self, Identity, IdentityStore};
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

const ANONYMOUS_USER: &str = "anonymous";

/// Appended to a partial response persisted after a mid-stream failure.
const TRUNCATION_MARKER: &str = "\n\n[truncated]";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("database error: {0}")]
    Db(#[from] crate::db::DbError),
    #[error("identity store error: {0}")]
    Identity(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result of a whole-response turn.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub conversation_id: String,
}

/// Incremental events from a streamed turn.
#[derive(Debug, Clone)]
pub enum ChatStreamEvent {
    Delta(String),
    /// Generation failed after zero or more deltas; the turn is over.
    Error(String),
    Done,
}

pub struct ChatService {
    db: Database,
    identity_store: Arc<dyn IdentityStore>,
    graph: ConversationGraph,
}

impl ChatService {
    pub fn new(
        db: Database,
        identity_store: Arc<dyn IdentityStore>,
        graph: ConversationGraph,
    ) -> Self {
        Self {
            db,
            identity_store,
            graph,
        }
    }

    /// Run the pure stages for a turn and persist everything that must
    /// survive a failed generation: the conversation row, the user
    /// message, and the updated identity.
    async fn prepare_turn(
        &self,
        conversation_id: Option<&str>,
        message: &str,
    ) -> Result<(String, TurnPlan), ChatError> {
        let conversation_id = match conversation_id {
            Some(id) => match self.db.get_conversation(id) {
                Ok(conversation) => conversation.id,
                Err(crate::db::DbError::ConversationNotFound(_)) => {
                    self.db.create_conversation(id, ANONYMOUS_USER)?.id
                }
                Err(e) => return Err(e.into()),
            },
            None => {
                let id = Uuid::new_v4().to_string();
                self.db.create_conversation(&id, ANONYMOUS_USER)?.id
            }
        };

        let stored = self
            .identity_store
            .get(&conversation_id)
            .await
            .map_err(ChatError::Identity)?;

        // Nothing stored yet: rebuild from the conversation's user turns.
        let previous = if stored == Identity::default() {
            let history: Vec<String> = self
                .db
                .get_messages(&conversation_id)?
                .into_iter()
                .filter(|m| m.role == MessageRole::User)
                .map(|m| m.content)
                .collect();
            identity::rebuild(&history, message)
        } else {
            stored
        };

        self.db.add_message(
            &Uuid::new_v4().to_string(),
            &conversation_id,
            MessageRole::User,
            message,
        )?;

        let plan = plan_turn(&previous, message);

        self.identity_store
            .put(&conversation_id, &plan.identity)
            .await
            .map_err(ChatError::Identity)?;

        Ok((conversation_id, plan))
    }

    /// Run one turn in whole-response mode.
    pub async fn chat(
        &self,
        conversation_id: Option<&str>,
        message: &str,
    ) -> Result<ChatOutcome, ChatError> {
        let (conversation_id, plan) = self.prepare_turn(conversation_id, message).await?;

        let response = self.graph.respond(&plan).await?;

        self.db.add_message(
            &Uuid::new_v4().to_string(),
            &conversation_id,
            MessageRole::Assistant,
            &response,
        )?;

        tracing::info!(
            conversation_id = %conversation_id,
            decision = ?plan.decision,
            "chat turn completed"
        );

        Ok(ChatOutcome {
            response,
            conversation_id,
        })
    }

    /// Run one turn in streaming mode.
    ///
    /// The accumulated text is persisted once the stream ends. On a
    /// mid-stream failure the partial text is persisted with a visible
    /// truncation marker rather than dropped.
    pub async fn chat_stream(
        &self,
        conversation_id: Option<&str>,
        message: &str,
    ) -> Result<(String, mpsc::Receiver<ChatStreamEvent>), ChatError> {
        let (conversation_id, plan) = self.prepare_turn(conversation_id, message).await?;
        let mut stream = self.graph.respond_streaming(&plan).await?;

        let (tx, rx) = mpsc::channel(32);
        let db = self.db.clone();
        let conv = conversation_id.clone();

        tokio::spawn(async move {
            let mut accumulated = String::new();
            let mut truncated = false;

            while let Some(item) = stream.next().await {
                match item {
                    Ok(fragment) => {
                        accumulated.push_str(&fragment);
                        if tx.send(ChatStreamEvent::Delta(fragment)).await.is_err() {
                            // Receiver dropped; keep what was delivered.
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            conversation_id = %conv,
                            error = %e,
                            "completion stream failed mid-response"
                        );
                        truncated = true;
                        let _ = tx.send(ChatStreamEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }

            if !accumulated.is_empty() {
                if truncated {
                    accumulated.push_str(TRUNCATION_MARKER);
                }
                if let Err(e) = db.add_message(
                    &Uuid::new_v4().to_string(),
                    &conv,
                    MessageRole::Assistant,
                    &accumulated,
                ) {
                    tracing::error!(
                        conversation_id = %conv,
                        error = %e,
                        "failed to persist streamed response"
                    );
                }
            }

            let _ = tx.send(ChatStreamEvent::Done).await;
        });

        Ok((conversation_id, rx))
    }
}
