//! HTTP API
//!
//! One synchronous chat endpoint, one streaming chat endpoint, and
//! read-only conversation listings. All the interesting behavior lives
//! below this layer.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::chat::ChatService;
use crate::db::Database;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Absent when no completion provider is configured; chat endpoints
    /// answer 503 until one is.
    pub chat: Option<Arc<ChatService>>,
}

impl AppState {
    pub fn new(db: Database, chat: Option<Arc<ChatService>>) -> Self {
        Self { db, chat }
    }
}
