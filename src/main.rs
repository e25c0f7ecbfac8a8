//! Nightingale - unit policy assistant for nursing staff
//!
//! A Rust backend that routes nurse questions to unit-specific policy
//! text through a small conversation graph backed by an external
//! text-completion service.

mod api;
mod chat;
mod db;
mod directory;
mod graph;
mod identity;
mod llm;
mod policy;

use api::{create_router, AppState};
use chat::ChatService;
use db::Database;
use graph::ConversationGraph;
use llm::{CompletionService, LlmConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nightingale=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("NIGHTINGALE_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.nightingale/nightingale.db")
    });

    let port: u16 = std::env::var("NIGHTINGALE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    // Initialize the completion service
    let llm_config = LlmConfig::from_env();
    let chat_service = match llm::create_service(&llm_config) {
        Some(service) => {
            tracing::info!(model = %service.model_id(), "Completion service initialized");
            let graph = ConversationGraph::new(service, llm_config.temperature);
            let identity_store = Arc::new(db.clone());
            Some(Arc::new(ChatService::new(
                db.clone(),
                identity_store,
                graph,
            )))
        }
        None => {
            tracing::warn!("No completion provider configured. Set OPENAI_API_KEY or LLM_GATEWAY.");
            None
        }
    };

    // Create application state
    let state = AppState::new(db, chat_service);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Nightingale server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
