//! Prompt assembly
//!
//! Pure string builders shared by the whole-response and streaming call
//! paths; delivery mode never changes what gets sent to the model.

use crate::identity::Identity;

const PREAMBLE: &str = "You are a helpful assistant for hospital nursing staff.";

/// Which clarification the assistant should ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarifyKind {
    BothMissing,
    UnitMissing,
    RoleMissing,
    /// Identity is complete but the message is not a clear question.
    VagueQuestion,
}

impl ClarifyKind {
    pub fn for_identity(identity: &Identity) -> Self {
        match (&identity.unit, &identity.role) {
            (None, None) => ClarifyKind::BothMissing,
            (None, Some(_)) => ClarifyKind::UnitMissing,
            (Some(_), None) => ClarifyKind::RoleMissing,
            (Some(_), Some(_)) => ClarifyKind::VagueQuestion,
        }
    }
}

/// Build the clarification prompt for a turn.
pub fn clarify_prompt(kind: ClarifyKind, message: &str) -> String {
    let ask = match kind {
        ClarifyKind::BothMissing => {
            "Ask which hospital unit they work in and what their role is \
             (for example nurse, physician, or tech)."
        }
        ClarifyKind::UnitMissing => {
            "You already know their role. Ask which hospital unit they work in."
        }
        ClarifyKind::RoleMissing => {
            "You already know their unit. Ask what their role is \
             (for example nurse, physician, or tech)."
        }
        ClarifyKind::VagueQuestion => {
            "You know their unit and role, but their message is not a clear \
             policy question. Ask what specific policy topic they need help with."
        }
    };

    format!(
        "{PREAMBLE} A staff member said: \"{message}\"\n\n\
         {ask}\n\n\
         Keep the reply to one or two friendly sentences."
    )
}

/// Build the grounded answer prompt from identity, question, and the
/// retrieved policy context.
pub fn grounded_prompt(identity: &Identity, question: &str, context: &str) -> String {
    let unit = identity.unit.as_deref().unwrap_or("unknown unit");
    let role = identity.role.as_deref().unwrap_or("staff member");

    format!(
        "{PREAMBLE}\n\n\
         Staff member: {role} on unit {unit}\n\
         Question: {question}\n\n\
         Relevant policy excerpts:\n\
         {context}\n\n\
         Answer the question using the policy excerpts above. Be specific \
         and practical, reference unit-specific content when it applies, and \
         say clearly when the excerpts do not cover the question. Keep the \
         tone professional and friendly."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clarify_kind_covers_all_gaps() {
        let both = Identity::default();
        assert_eq!(ClarifyKind::for_identity(&both), ClarifyKind::BothMissing);

        let role_only = Identity {
            unit: None,
            role: Some("NURSE".to_string()),
        };
        assert_eq!(ClarifyKind::for_identity(&role_only), ClarifyKind::UnitMissing);

        let unit_only = Identity {
            unit: Some("RR ED".to_string()),
            role: None,
        };
        assert_eq!(ClarifyKind::for_identity(&unit_only), ClarifyKind::RoleMissing);

        let complete = Identity {
            unit: Some("RR ED".to_string()),
            role: Some("NURSE".to_string()),
        };
        assert_eq!(
            ClarifyKind::for_identity(&complete),
            ClarifyKind::VagueQuestion
        );
    }

    #[test]
    fn both_missing_asks_for_unit_and_role() {
        let prompt = clarify_prompt(ClarifyKind::BothMissing, "hi");
        assert!(prompt.contains("unit"));
        assert!(prompt.contains("role"));
        assert!(prompt.contains("\"hi\""));
    }

    #[test]
    fn grounded_prompt_embeds_identity_question_and_context() {
        let identity = Identity {
            unit: Some("RR 6ICU".to_string()),
            role: Some("NURSE".to_string()),
        };
        let prompt = grounded_prompt(&identity, "hand hygiene?", "Policy text here");
        assert!(prompt.contains("NURSE on unit RR 6ICU"));
        assert!(prompt.contains("Question: hand hygiene?"));
        assert!(prompt.contains("Policy text here"));
    }
}
