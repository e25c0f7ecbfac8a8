//! Text-completion service abstraction
//!
//! One trait covering the whole-response and streaming modes of the
//! external language-generation call; providers translate to their wire
//! formats behind it.

mod error;
mod openai;
mod registry;
mod types;

#[cfg(test)]
pub mod testing;

pub use error::{LlmError, LlmErrorKind};
pub use openai::{OpenAIModel, OpenAIService};
pub use registry::{create_service, LlmConfig};
pub use types::{Completion, CompletionRequest, Usage};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Finite, non-restartable sequence of text fragments from a streaming
/// completion call.
pub type CompletionStream = BoxStream<'static, Result<String, LlmError>>;

/// Common interface for text-completion providers.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Request a whole completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Request the same completion as an incremental fragment stream.
    async fn stream(&self, request: &CompletionRequest) -> Result<CompletionStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn CompletionService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn CompletionService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionService for LoggingService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(completion) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    input_tokens = completion.usage.input_tokens,
                    output_tokens = completion.usage.output_tokens,
                    "completion request finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "completion request failed"
                );
            }
        }

        result
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<CompletionStream, LlmError> {
        let result = self.inner.stream(request).await;
        match &result {
            Ok(_) => tracing::debug!(model = %self.model_id, "completion stream opened"),
            Err(e) => tracing::error!(
                model = %self.model_id,
                error = %e.message,
                "completion stream failed to open"
            ),
        }
        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
