//! Caller identity: self-reported hospital unit and role
//!
//! The extractor is a pure function over one message; accumulation across
//! turns is the caller's job (feed prior user turns back through
//! [`extract`] when rebuilding identity from scratch).

use crate::directory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Role keywords scanned in order; the first one found wins.
/// Nurse-equivalent credentials normalize to the canonical "NURSE" role.
const ROLE_KEYWORDS: &[&str] = &[
    "NURSE",
    "DOCTOR",
    "PHYSICIAN",
    "TECH",
    "TECHNICIAN",
    "ASSISTANT",
    "RN",
    "LPN",
    "CNA",
];

const NURSE_EQUIVALENTS: &[&str] = &["NURSE", "RN", "LPN", "CNA"];

/// Accumulated caller identity for one conversation.
///
/// Fields set from a match are never reset to unknown within the same
/// conversation; a later extraction of the same kind may overwrite them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub unit: Option<String>,
    pub role: Option<String>,
}

impl Identity {
    pub fn is_complete(&self) -> bool {
        self.unit.is_some() && self.role.is_some()
    }
}

/// Extract unit and role from one message, merging into the previous
/// identity. Pure: never mutates its input, never fails — unresolved
/// fields simply retain their previous values.
pub fn extract(message: &str, previous: &Identity) -> Identity {
    let upper = message.to_uppercase();
    let mut next = previous.clone();

    if let Some(keyword) = ROLE_KEYWORDS.iter().find(|k| upper.contains(*k)) {
        if NURSE_EQUIVALENTS.contains(keyword) {
            next.role = Some("NURSE".to_string());
        } else {
            next.role = Some((*keyword).to_string());
        }
    }

    if let Some(unit) = directory::resolve(message) {
        next.unit = Some(unit.to_string());
    }

    next
}

/// Rebuild identity from ordered prior user turns plus the current
/// message. Used when no stored identity exists for a conversation.
pub fn rebuild(user_turns: &[String], current: &str) -> Identity {
    let mut identity = Identity::default();
    for turn in user_turns {
        identity = extract(turn, &identity);
    }
    extract(current, &identity)
}

/// Persistence seam for per-conversation identity.
///
/// The graph never assumes in-process memory as the system of record;
/// production uses the conversations table, tests use [`MemoryIdentityStore`].
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get(&self, conversation_id: &str) -> Result<Identity, String>;
    async fn put(&self, conversation_id: &str, identity: &Identity) -> Result<(), String>;
}

/// In-memory identity store, one map slot per conversation key.
#[derive(Default)]
pub struct MemoryIdentityStore {
    entries: RwLock<HashMap<String, Identity>>,
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get(&self, conversation_id: &str) -> Result<Identity, String> {
        Ok(self
            .entries
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn put(&self, conversation_id: &str, identity: &Identity) -> Result<(), String> {
        self.entries
            .write()
            .await
            .insert(conversation_id.to_string(), identity.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn no_keywords_is_a_noop() {
        let previous = Identity {
            unit: Some("RR 6ICU".to_string()),
            role: Some("NURSE".to_string()),
        };
        let next = extract("what about visiting hours?", &previous);
        assert_eq!(next, previous);
    }

    #[test]
    fn nurse_equivalents_normalize() {
        for message in ["I'm an RN", "LPN here", "working as a CNA today"] {
            let identity = extract(message, &Identity::default());
            assert_eq!(identity.role.as_deref(), Some("NURSE"), "{message}");
        }
    }

    #[test]
    fn other_roles_keep_their_keyword() {
        let identity = extract("I'm the attending physician", &Identity::default());
        assert_eq!(identity.role.as_deref(), Some("PHYSICIAN"));
    }

    #[test]
    fn unit_and_role_from_one_message() {
        let identity = extract(
            "RR 6ICU nurse, when should I change IV dressings?",
            &Identity::default(),
        );
        assert_eq!(identity.unit.as_deref(), Some("RR 6ICU"));
        assert_eq!(identity.role.as_deref(), Some("NURSE"));
        assert!(identity.is_complete());
    }

    #[test]
    fn set_fields_survive_unrelated_messages() {
        let mut identity = extract("I'm a nurse in the ICU", &Identity::default());
        assert!(identity.is_complete());
        identity = extract("ok thanks", &identity);
        assert!(identity.is_complete());
    }

    #[test]
    fn established_unit_survives_ordinary_questions() {
        // "where", "need", "used" contain short unit aliases as fragments;
        // none of them may disturb an established identity.
        let previous = Identity {
            unit: Some("RR 6ICU".to_string()),
            role: Some("NURSE".to_string()),
        };
        let next = extract("where should restraint checks be documented?", &previous);
        assert_eq!(next.unit.as_deref(), Some("RR 6ICU"));

        // Nor fabricate a unit from nothing.
        let fresh = extract("I need help with a policy question, nurse here", &Identity::default());
        assert_eq!(fresh.unit, None);
        assert_eq!(fresh.role.as_deref(), Some("NURSE"));
    }

    #[test]
    fn later_match_overwrites_unit() {
        let first = extract("I'm in oncology", &Identity::default());
        assert_eq!(first.unit.as_deref(), Some("RR 6E"));
        let second = extract("actually I moved to the ED", &first);
        assert_eq!(second.unit.as_deref(), Some("RR ED"));
    }

    #[test]
    fn rebuild_folds_over_history() {
        let history = vec!["hi".to_string(), "I'm a nurse".to_string()];
        let identity = rebuild(&history, "I work in the ICU");
        assert_eq!(identity.role.as_deref(), Some("NURSE"));
        assert_eq!(identity.unit.as_deref(), Some("RR 6ICU"));
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryIdentityStore::default();
        assert_eq!(store.get("c1").await.unwrap(), Identity::default());

        let identity = Identity {
            unit: Some("RR ED".to_string()),
            role: Some("NURSE".to_string()),
        };
        store.put("c1", &identity).await.unwrap();
        assert_eq!(store.get("c1").await.unwrap(), identity);
        // Other keys are unaffected.
        assert_eq!(store.get("c2").await.unwrap(), Identity::default());
    }

    proptest! {
        // Applying extract twice with the same message yields the same
        // result as applying it once.
        #[test]
        fn extract_is_idempotent(message in ".{0,120}") {
            let once = extract(&message, &Identity::default());
            let twice = extract(&message, &once);
            prop_assert_eq!(once, twice);
        }

        // Extraction never clears a field that was already set.
        #[test]
        fn extract_never_resets_fields(message in ".{0,120}") {
            let previous = Identity {
                unit: Some("RR 7ICU".to_string()),
                role: Some("NURSE".to_string()),
            };
            let next = extract(&message, &previous);
            prop_assert!(next.unit.is_some());
            prop_assert!(next.role.is_some());
        }
    }
}
