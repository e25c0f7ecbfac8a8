//! Static unit-policy store
//!
//! A fixed, keyword-indexed set of policy documents partitioned by unit
//! family. Loaded once at process start (const data), matched by cheap
//! substring overlap — deliberately not a search engine.

use crate::directory::UnitFamily;

/// One policy document in the static store.
#[derive(Debug, Clone, Copy)]
pub struct PolicyDocument {
    /// Stable identifier, underscore-delimited keywords ("iv_lines").
    pub id: &'static str,
    pub title: &'static str,
    pub content: &'static str,
}

/// A document selected for a question, annotated with the unit-specific
/// disclaimer required on every returned policy.
#[derive(Debug, Clone)]
pub struct PolicyMatch {
    pub title: String,
    pub content: &'static str,
    pub disclaimer: String,
}

impl PolicyMatch {
    /// Render this match as a context block for the grounded prompt.
    pub fn as_context_block(&self) -> String {
        format!("{}\n{}\n{}", self.title, self.content.trim(), self.disclaimer)
    }
}

/// Select the policy documents relevant to a question for a unit.
///
/// Family selection: ICU-like units get ICU policies, ED-like units get ED
/// policies, anything else falls back to ICU policies. A document matches
/// when its id appears in the lowercased question, any underscore token of
/// its id appears, or any of the question's first three whitespace tokens
/// appears in the document content. Zero matches fall back to exactly one
/// relabeled "general" document, so the result is never empty. Matches keep
/// store insertion order; no relevance ranking.
pub fn lookup(unit: &str, question: &str) -> Vec<PolicyMatch> {
    let family = UnitFamily::for_unit(unit);
    let documents = match family {
        UnitFamily::IcuLike => ICU_POLICIES,
        UnitFamily::EdLike => ED_POLICIES,
    };

    let question_lower = question.to_lowercase();
    let leading_tokens: Vec<&str> = question_lower.split_whitespace().take(3).collect();

    let mut matches: Vec<PolicyMatch> = documents
        .iter()
        .filter(|doc| {
            question_lower.contains(doc.id)
                || doc.id.split('_').any(|token| question_lower.contains(token))
                || {
                    let content_lower = doc.content.to_lowercase();
                    leading_tokens.iter().any(|t| content_lower.contains(*t))
                }
        })
        .map(|doc| PolicyMatch {
            title: doc.title.to_string(),
            content: doc.content,
            disclaimer: format!("This policy is specific to {unit} operations."),
        })
        .collect();

    if matches.is_empty() {
        let first = &documents[0];
        matches.push(PolicyMatch {
            title: format!("General {unit} Policy"),
            content: first.content,
            disclaimer: format!(
                "This is a general policy for {unit}. Please be more specific for targeted policies."
            ),
        });
    }

    matches
}

const ICU_POLICIES: &[PolicyDocument] = &[
    PolicyDocument {
        id: "hand_hygiene",
        title: "Hand Hygiene Protocol for ICU",
        content: r"
**Hand Hygiene in ICU Settings**

1. **Before patient contact**: Use alcohol-based hand rub for 15-20 seconds
2. **After patient contact**: Wash hands with soap and water for 20 seconds
3. **Before invasive procedures**: Surgical hand antisepsis required
4. **After contact with contaminated surfaces**: Immediate hand hygiene

**ICU-Specific Requirements:**
- Hand hygiene compliance must be >95% in ICU settings
- Use chlorhexidine-based products for high-risk patients
- Gloving does not replace hand hygiene

**Monitoring:** Hand hygiene compliance is monitored hourly in ICU units.
",
    },
    PolicyDocument {
        id: "iv_lines",
        title: "IV Line Management in ICU",
        content: r"
**IV Line Care and Maintenance**

1. **Assessment frequency**: Every 4 hours minimum
2. **Site inspection**: Check for signs of infiltration, phlebitis, infection
3. **Dressing changes**: Transparent dressings every 7 days or when compromised
4. **Flushing protocol**: Normal saline flush before and after medication administration

**ICU-Specific Guidelines:**
- Central lines require daily necessity assessment
- Use chlorhexidine for skin antisepsis
- Document all assessments in ICU flowsheet

**Removal criteria:** Remove peripheral IVs after 72-96 hours unless clinically indicated.
",
    },
    PolicyDocument {
        id: "isolation_precautions",
        title: "Isolation Precautions in ICU",
        content: r"
**ICU Isolation Protocols**

1. **Standard precautions**: Apply to all patients
2. **Contact precautions**: MRSA, VRE, C. diff patients
3. **Droplet precautions**: Respiratory infections
4. **Airborne precautions**: TB, COVID-19 (negative pressure rooms)

**ICU Requirements:**
- PPE donning/doffing stations outside each room
- Dedicated equipment for isolated patients
- Enhanced environmental cleaning protocols

**Documentation:** All isolation measures documented in ICU assessment forms.
",
    },
];

const ED_POLICIES: &[PolicyDocument] = &[
    PolicyDocument {
        id: "triage",
        title: "Emergency Department Triage Protocol",
        content: r"
**ED Triage Assessment**

1. **ESI Level 1**: Immediate life-threatening conditions
2. **ESI Level 2**: High-risk situations, should be seen within 14 minutes
3. **ESI Level 3**: Stable patients requiring multiple resources
4. **ESI Level 4**: Stable patients requiring one resource
5. **ESI Level 5**: Non-urgent conditions

**ED-Specific Requirements:**
- Triage completed within 10 minutes of arrival
- Vital signs for all patients except ESI 5
- Pain assessment using 0-10 scale

**Documentation:** All triage decisions documented in ED tracking system.
",
    },
    PolicyDocument {
        id: "hand_hygiene",
        title: "Hand Hygiene in Emergency Department",
        content: r"
**ED Hand Hygiene Protocol**

1. **Between patients**: Alcohol-based hand rub minimum
2. **After contact with blood/body fluids**: Soap and water required
3. **Before procedures**: Enhanced hand hygiene with antiseptic
4. **High-turnover environment**: Hand hygiene stations every 10 feet

**ED-Specific Challenges:**
- Rapid patient turnover requires efficient hand hygiene
- Emergency situations may require modified protocols
- Use of gloves common but doesn't replace hand hygiene

**Compliance target:** >90% in ED (lower than ICU due to emergency nature).
",
    },
    PolicyDocument {
        id: "medication_administration",
        title: "Emergency Medication Administration",
        content: r"
**ED Medication Safety**

1. **Verification**: Two patient identifiers before any medication
2. **High-alert medications**: Double verification required
3. **Emergency situations**: Verbal orders acceptable with immediate documentation
4. **Pain management**: Follow ED pain protocols

**ED-Specific Protocols:**
- Crash cart medications have special procedures
- Conscious sedation requires continuous monitoring
- Allergy verification critical in emergency settings

**Documentation:** All medications documented within 30 minutes in ED system.
",
    },
];
