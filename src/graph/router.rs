//! Clarify-vs-retrieve routing
//!
//! Cheap, explainable heuristics. The assistant must never answer with
//! unit-specific guidance while identity is unknown, so every rule here
//! biases toward asking a clarifying question.

use crate::identity::Identity;

/// The two graph outcomes for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Ask a follow-up question instead of answering.
    Clarify,
    /// Look up policy context and answer.
    Retrieve,
}

/// Greeting/help tokens. A short message containing one routes to clarify
/// even when identity is already complete.
const GREETING_TOKENS: &[&str] = &["hi", "hello", "hey", "help", "how does this work"];

/// A message without any of these reads as too vague to answer.
const QUESTION_WORDS: &[&str] = &["what", "how", "when", "where", "why", "can", "should"];

/// Decide the outcome for one turn. Deterministic, first matching rule wins.
pub fn route(identity: &Identity, message: &str) -> RouteDecision {
    let lower = message.to_lowercase();
    let length = message.chars().count();

    if length < 50 && GREETING_TOKENS.iter().any(|t| lower.contains(t)) {
        return RouteDecision::Clarify;
    }

    if !identity.is_complete() {
        return RouteDecision::Clarify;
    }

    if length < 10 || !QUESTION_WORDS.iter().any(|w| lower.contains(w)) {
        return RouteDecision::Clarify;
    }

    RouteDecision::Retrieve
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn complete_identity() -> Identity {
        Identity {
            unit: Some("RR 6ICU".to_string()),
            role: Some("NURSE".to_string()),
        }
    }

    #[test]
    fn greeting_clarifies_even_with_complete_identity() {
        assert_eq!(route(&complete_identity(), "hi"), RouteDecision::Clarify);
        assert_eq!(route(&complete_identity(), "hello there"), RouteDecision::Clarify);
        assert_eq!(
            route(&complete_identity(), "how does this work"),
            RouteDecision::Clarify
        );
    }

    #[test]
    fn long_message_escapes_greeting_rule() {
        let message =
            "hello, what should the assessment frequency be for peripheral lines on my unit?";
        assert!(message.chars().count() >= 50);
        assert_eq!(route(&complete_identity(), message), RouteDecision::Retrieve);
    }

    #[test]
    fn incomplete_identity_always_clarifies() {
        let missing_role = Identity {
            unit: Some("RR 6ICU".to_string()),
            role: None,
        };
        assert_eq!(
            route(&missing_role, "what is the dressing change policy?"),
            RouteDecision::Clarify
        );
    }

    #[test]
    fn vague_message_clarifies() {
        assert_eq!(route(&complete_identity(), "ok"), RouteDecision::Clarify);
        assert_eq!(
            route(&complete_identity(), "the dressing policy please"),
            RouteDecision::Clarify
        );
    }

    #[test]
    fn clear_question_retrieves() {
        assert_eq!(
            route(&complete_identity(), "when do I change IV dressings?"),
            RouteDecision::Retrieve
        );
    }

    proptest! {
        // No message can route to retrieve while identity is incomplete.
        #[test]
        fn never_retrieves_without_identity(message in ".{0,200}") {
            prop_assert_eq!(
                route(&Identity::default(), &message),
                RouteDecision::Clarify
            );
        }
    }
}
