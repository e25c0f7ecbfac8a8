//! Conversation graph
//!
//! One pass per user message: extract identity, route, then either ask a
//! clarifying question or answer from retrieved policy context. Planning
//! is pure; only the final generation step talks to the outside world.

pub mod prompts;
pub mod router;

pub use prompts::ClarifyKind;
pub use router::{route, RouteDecision};

use crate::identity::{self, Identity};
use crate::llm::{CompletionRequest, CompletionService, CompletionStream, LlmError};
use crate::policy;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Bound on a hung external call, fatal to the turn when exceeded.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),
}

/// Everything decided about a turn before the external call is made.
#[derive(Debug, Clone)]
pub struct TurnPlan {
    /// Identity after folding in the current message.
    pub identity: Identity,
    pub decision: RouteDecision,
    /// Blank-line separated policy blocks; present only on retrieve.
    pub retrieved_context: Option<String>,
    /// Which clarification variant was chosen; present only on clarify.
    pub clarify_kind: Option<ClarifyKind>,
    /// The fully assembled prompt, identical for both delivery modes.
    pub prompt: String,
}

/// Run the pure stages of the graph for one message.
///
/// `previous` is the identity accumulated over the conversation so far;
/// callers rebuild it from stored user turns when nothing is persisted.
pub fn plan_turn(previous: &Identity, message: &str) -> TurnPlan {
    let identity = identity::extract(message, previous);
    let decision = router::route(&identity, message);

    match decision {
        RouteDecision::Clarify => {
            let kind = ClarifyKind::for_identity(&identity);
            TurnPlan {
                prompt: prompts::clarify_prompt(kind, message),
                retrieved_context: None,
                clarify_kind: Some(kind),
                identity,
                decision,
            }
        }
        RouteDecision::Retrieve => {
            // Retrieve implies a complete identity; the router guarantees it.
            let unit = identity.unit.as_deref().unwrap_or_default();
            let context = policy::lookup(unit, message)
                .iter()
                .map(policy::PolicyMatch::as_context_block)
                .collect::<Vec<_>>()
                .join("\n\n");
            TurnPlan {
                prompt: prompts::grounded_prompt(&identity, message, &context),
                retrieved_context: Some(context),
                clarify_kind: None,
                identity,
                decision,
            }
        }
    }
}

/// Executes a planned turn against the completion service.
#[derive(Clone)]
pub struct ConversationGraph {
    service: Arc<dyn CompletionService>,
    temperature: Option<f32>,
}

impl ConversationGraph {
    pub fn new(service: Arc<dyn CompletionService>, temperature: Option<f32>) -> Self {
        Self {
            service,
            temperature,
        }
    }

    fn request_for(&self, plan: &TurnPlan) -> CompletionRequest {
        let mut request = CompletionRequest::new(plan.prompt.clone());
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }

    /// Produce the whole response for a planned turn.
    pub async fn respond(&self, plan: &TurnPlan) -> Result<String, GraphError> {
        let request = self.request_for(plan);
        let completion = tokio::time::timeout(COMPLETION_TIMEOUT, self.service.complete(&request))
            .await
            .map_err(|_| LlmError::network("completion timed out"))??;
        Ok(completion.text)
    }

    /// Produce the response as a fragment stream.
    ///
    /// Clarify turns complete in whole-response mode and are replayed
    /// character by character, so callers see one uniform streaming
    /// contract regardless of the route taken.
    pub async fn respond_streaming(&self, plan: &TurnPlan) -> Result<CompletionStream, GraphError> {
        let request = self.request_for(plan);

        match plan.decision {
            RouteDecision::Clarify => {
                let completion =
                    tokio::time::timeout(COMPLETION_TIMEOUT, self.service.complete(&request))
                        .await
                        .map_err(|_| LlmError::network("completion timed out"))??;
                let fragments: Vec<Result<String, LlmError>> = completion
                    .text
                    .chars()
                    .map(|c| Ok(c.to_string()))
                    .collect();
                Ok(futures::stream::iter(fragments).boxed())
            }
            RouteDecision::Retrieve => {
                let stream =
                    tokio::time::timeout(COMPLETION_TIMEOUT, self.service.stream(&request))
                        .await
                        .map_err(|_| LlmError::network("completion timed out"))??;
                // A stalled stream is as fatal as a stalled open.
                let timed = tokio_stream::StreamExt::timeout(stream, COMPLETION_TIMEOUT)
                    .map(|item| match item {
                        Ok(fragment) => fragment,
                        Err(_) => Err(LlmError::network("completion stream stalled")),
                    });
                Ok(timed.boxed())
            }
        }
    }
}
