//! Persistence for conversations and messages
//!
//! Append-only message log plus conversation headers. The conversation row
//! is also the system of record for accumulated caller identity.

mod schema;

pub use schema::*;

use crate::identity::{Identity, IdentityStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Conversation Operations ====================

    /// Create a new conversation
    pub fn create_conversation(&self, id: &str, user_id: &str) -> DbResult<Conversation> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO conversations (id, user_id, title, unit, role, created_at, updated_at)
             VALUES (?1, ?2, NULL, NULL, NULL, ?3, ?3)",
            params![id, user_id, now.to_rfc3339()],
        )?;

        Ok(Conversation {
            id: id.to_string(),
            user_id: user_id.to_string(),
            title: None,
            unit: None,
            role: None,
            created_at: now,
            updated_at: now,
            message_count: 0,
        })
    }

    /// Get conversation by ID
    pub fn get_conversation(&self, id: &str) -> DbResult<Conversation> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.user_id, c.title, c.unit, c.role, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) as message_count
             FROM conversations c WHERE c.id = ?1",
        )?;

        stmt.query_row(params![id], parse_conversation_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::ConversationNotFound(id.to_string())
                }
                other => DbError::Sqlite(other),
            })
    }

    /// List conversations, most recently active first
    pub fn list_conversations(&self) -> DbResult<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.user_id, c.title, c.unit, c.role, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) as message_count
             FROM conversations c
             ORDER BY c.updated_at DESC",
        )?;

        let rows = stmt.query_map([], parse_conversation_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Store the accumulated identity on the conversation header
    pub fn set_conversation_identity(&self, id: &str, identity: &Identity) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let updated = conn.execute(
            "UPDATE conversations SET unit = ?1, role = ?2, updated_at = ?3 WHERE id = ?4",
            params![identity.unit, identity.role, now.to_rfc3339(), id],
        )?;

        if updated == 0 {
            return Err(DbError::ConversationNotFound(id.to_string()));
        }
        Ok(())
    }

    // ==================== Message Operations ====================

    /// Append a message to a conversation and bump its activity timestamp
    pub fn add_message(
        &self,
        id: &str,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> DbResult<Message> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        // Get next sequence ID
        let sequence_id: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO messages (id, conversation_id, sequence_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                conversation_id,
                sequence_id,
                role.as_str(),
                content,
                now.to_rfc3339()
            ],
        )?;

        let updated = conn.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), conversation_id],
        )?;
        if updated == 0 {
            return Err(DbError::ConversationNotFound(conversation_id.to_string()));
        }

        Ok(Message {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            sequence_id,
            role,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Get messages for a conversation in send order
    pub fn get_messages(&self, conversation_id: &str) -> DbResult<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, sequence_id, role, content, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id], parse_message_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

/// The conversations table is the system of record for per-conversation
/// identity. Missing rows read as an empty identity so callers can
/// rebuild from message history.
#[async_trait]
impl IdentityStore for Database {
    async fn get(&self, conversation_id: &str) -> Result<Identity, String> {
        match self.get_conversation(conversation_id) {
            Ok(conversation) => Ok(Identity {
                unit: conversation.unit,
                role: conversation.role,
            }),
            Err(DbError::ConversationNotFound(_)) => Ok(Identity::default()),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn put(&self, conversation_id: &str, identity: &Identity) -> Result<(), String> {
        self.set_conversation_identity(conversation_id, identity)
            .map_err(|e| e.to_string())
    }
}

fn parse_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        unit: row.get(3)?,
        role: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
        message_count: row.get(7)?,
    })
}

fn parse_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let role = match row.get::<_, String>(3)?.as_str() {
        "assistant" => MessageRole::Assistant,
        _ => MessageRole::User,
    };
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sequence_id: row.get(2)?,
        role,
        content: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_conversation() {
        let db = Database::open_in_memory().unwrap();

        let conv = db.create_conversation("conv-1", "anonymous").unwrap();
        assert_eq!(conv.id, "conv-1");
        assert_eq!(conv.user_id, "anonymous");
        assert!(conv.unit.is_none());
        assert_eq!(conv.message_count, 0);

        let fetched = db.get_conversation("conv-1").unwrap();
        assert_eq!(fetched.id, conv.id);
    }

    #[test]
    fn test_missing_conversation_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.get_conversation("nope"),
            Err(DbError::ConversationNotFound(_))
        ));
    }

    #[test]
    fn test_add_and_get_messages() {
        let db = Database::open_in_memory().unwrap();
        db.create_conversation("conv-1", "anonymous").unwrap();

        let msg1 = db
            .add_message("msg-1", "conv-1", MessageRole::User, "hi")
            .unwrap();
        let msg2 = db
            .add_message("msg-2", "conv-1", MessageRole::Assistant, "Which unit?")
            .unwrap();

        assert_eq!(msg1.sequence_id, 1);
        assert_eq!(msg2.sequence_id, 2);

        let messages = db.get_messages("conv-1").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].role, MessageRole::Assistant);

        let fetched = db.get_conversation("conv-1").unwrap();
        assert_eq!(fetched.message_count, 2);
    }

    #[test]
    fn test_list_orders_by_recent_activity() {
        let db = Database::open_in_memory().unwrap();
        db.create_conversation("conv-1", "anonymous").unwrap();
        db.create_conversation("conv-2", "anonymous").unwrap();

        // Activity on conv-1 moves it to the front.
        db.add_message("msg-1", "conv-1", MessageRole::User, "hello")
            .unwrap();

        let listed = db.list_conversations().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "conv-1");
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nightingale.db");

        let db = Database::open(&path).unwrap();
        db.create_conversation("conv-1", "anonymous").unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.list_conversations().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_identity_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.create_conversation("conv-1", "anonymous").unwrap();

        let store: &dyn IdentityStore = &db;
        assert_eq!(store.get("conv-1").await.unwrap(), Identity::default());

        let identity = Identity {
            unit: Some("RR 6ICU".to_string()),
            role: Some("NURSE".to_string()),
        };
        store.put("conv-1", &identity).await.unwrap();
        assert_eq!(store.get("conv-1").await.unwrap(), identity);

        // Unknown conversations read as empty, not as an error.
        assert_eq!(store.get("other").await.unwrap(), Identity::default());
    }

    #[tokio::test]
    async fn test_identity_put_requires_conversation() {
        let db = Database::open_in_memory().unwrap();
        let store: &dyn IdentityStore = &db;
        let identity = Identity::default();
        assert!(store.put("missing", &identity).await.is_err());
    }
}
