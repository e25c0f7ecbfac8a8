//! Mock completion service for tests

use super::{Completion, CompletionRequest, CompletionService, CompletionStream, LlmError, Usage};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Mutex;

/// Scripted completion service: records prompts, returns a fixed text or a
/// fixed error, and streams by splitting the text into word-ish fragments.
pub struct MockCompletion {
    response: Result<String, (super::LlmErrorKind, String)>,
    /// Number of fragments to emit before failing, when simulating a
    /// stream that dies mid-way. `None` streams to completion.
    fail_after_fragments: Option<usize>,
    pub prompts: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            fail_after_fragments: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kind: super::LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            response: Err((kind, message.into())),
            fail_after_fragments: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_text_failing_after(text: impl Into<String>, fragments: usize) -> Self {
        Self {
            response: Ok(text.into()),
            fail_after_fragments: Some(fragments),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().map(|r| r.prompt.clone())
    }

    fn record(&self, request: &CompletionRequest) {
        self.prompts.lock().unwrap().push(request.clone());
    }

    fn fragments(text: &str) -> Vec<String> {
        // Split keeping whitespace so the concatenation round-trips.
        let mut out = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            current.push(ch);
            if ch.is_whitespace() {
                out.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.record(request);
        match &self.response {
            Ok(text) => Ok(Completion {
                text: text.clone(),
                usage: Usage::default(),
            }),
            Err((kind, message)) => Err(LlmError::new(*kind, message.clone())),
        }
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<CompletionStream, LlmError> {
        self.record(request);
        match &self.response {
            Ok(text) => {
                let mut items: Vec<Result<String, LlmError>> =
                    Self::fragments(text).into_iter().map(Ok).collect();
                if let Some(n) = self.fail_after_fragments {
                    items.truncate(n);
                    items.push(Err(LlmError::network("stream interrupted")));
                }
                Ok(futures::stream::iter(items).boxed())
            }
            Err((kind, message)) => Err(LlmError::new(*kind, message.clone())),
        }
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
