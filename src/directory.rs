//! Hospital unit directory
//!
//! Static mapping of canonical unit codes to free-text aliases, plus the
//! coarse policy-family classification used by the policy store.

/// Coarse bucket used to select which policy subset applies to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    IcuLike,
    EdLike,
}

impl UnitFamily {
    /// Classify a canonical unit code (or any free-text unit string).
    ///
    /// Units that are neither ICU-like nor ED-like fall back to the ICU
    /// family rather than erroring.
    pub fn for_unit(unit: &str) -> Self {
        let upper = unit.to_uppercase();
        if upper.contains("ICU") {
            UnitFamily::IcuLike
        } else if upper.contains("ED") || upper.contains("EMERGENCY") {
            UnitFamily::EdLike
        } else {
            UnitFamily::IcuLike
        }
    }
}

/// One directory entry: canonical code plus its alias set.
struct UnitEntry {
    code: &'static str,
    aliases: &'static [&'static str],
}

/// Ordered unit directory. Resolution is first-match-wins in this order,
/// so an alias shared by two units (e.g. "ICU", "SURGERY") resolves to the
/// earlier entry. Accepted ambiguity, not disambiguated by context.
const UNITS: &[UnitEntry] = &[
    // Ronald Reagan hospital
    UnitEntry { code: "RR 6N", aliases: &["6N", "6 NORTH", "NEUROSURGERY", "NEUROLOGY", "NEURO"] },
    UnitEntry { code: "RR 6E", aliases: &["6E", "6 EAST", "ONCOLOGY"] },
    UnitEntry { code: "RR 6W", aliases: &["6W", "6 WEST", "NEUROLOGY", "SURGERY", "VASCULAR", "VASCULAR SURGERY", "PLASTICS", "PLASTIC SURGERY"] },
    UnitEntry { code: "RR 7N", aliases: &["7N", "7 NORTH", "CARDIAC OBSERVATION UNIT", "CARDIOLOGY", "COU"] },
    UnitEntry { code: "RR 7E", aliases: &["7E", "7 EAST", "GENERAL MEDICINE", "INTERNAL MEDICINE", "GENERAL MED", "MEDICINE"] },
    UnitEntry { code: "RR 7W", aliases: &["7W", "7 WEST", "MOU", "MEDICAL OBSERVATION UNIT"] },
    UnitEntry { code: "RR 8N", aliases: &["8N", "8 NORTH", "LIVER TRANSPLANT", "LIVER TX"] },
    UnitEntry { code: "RR 8E", aliases: &["8E", "8 EAST", "GENERAL SURGERY", "SURGERY"] },
    UnitEntry { code: "RR 8W", aliases: &["8W", "8 WEST", "UROLOGY", "HEAD & NECK", "GENERAL SURGERY", "SURGERY"] },
    UnitEntry { code: "RR 6ICU", aliases: &["6ICU", "6 NEUROLOGICAL INTENSIVE CARE UNIT", "ICU", "NEUROSURGERY", "TRAUMA", "SURGERY"] },
    UnitEntry { code: "RR 7ICU", aliases: &["7ICU", "7 CARDIAC SURGERY UNIT", "ICU", "CARDIOLOGY", "HEART TRANSPLANT", "CARDIO-THORACIC", "VASCULAR", "SURGERY"] },
    UnitEntry { code: "RR 8ICU", aliases: &["8ICU", "8 INTENSIVE CARE UNIT", "ICU", "LIVER TRANSPLANT", "SURGERY"] },
    UnitEntry { code: "RR 4ICU", aliases: &["4ICU", "4 ICU", "ICU", "MEDICAL ICU", "MEDICINE"] },
    UnitEntry { code: "RR ED", aliases: &["RR ED", "ED", "ER", "EMC", "EMERGENCY", "EMERGENCY ROOM"] },
    // Santa Monica hospital
    UnitEntry { code: "SM 4CWICU", aliases: &["4CWICU", "4 CENTRAL WING ICU", "ICU", "PICU"] },
    UnitEntry { code: "SM ED", aliases: &["SM ED", "ED", "ER", "EMC", "EMERGENCY", "EMERGENCY ROOM"] },
];

/// Resolve a free-text unit reference to a canonical unit code.
///
/// Exact canonical match first, then exact alias membership, then an
/// ordered scan for codes or aliases mentioned in the input so that
/// references embedded in whole sentences still resolve. Returns `None`
/// when nothing matches; never errors.
pub fn resolve(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    let needle = upper.trim();

    if let Some(entry) = UNITS.iter().find(|e| e.code == needle) {
        return Some(entry.code);
    }

    if let Some(entry) = UNITS
        .iter()
        .find(|e| e.aliases.iter().any(|a| *a == needle))
    {
        return Some(entry.code);
    }

    // Word-anchored scan over the whole input. Short aliases ("ED", "ER")
    // must match whole words, never fragments of them ("where", "need"),
    // or every mention of one would fabricate a unit.
    let tokens: Vec<&str> = upper
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    UNITS
        .iter()
        .find(|e| {
            mentions(&upper, &tokens, e.code)
                || e.aliases.iter().any(|&a| mentions(&upper, &tokens, a))
        })
        .map(|e| e.code)
}

/// Whether `needle` occurs in the input as a whole word (single-token
/// needles) or as a word-bounded phrase (multi-token needles).
fn mentions(upper: &str, tokens: &[&str], needle: &str) -> bool {
    if needle.chars().all(char::is_alphanumeric) {
        return tokens.contains(&needle);
    }

    let bytes = upper.as_bytes();
    let mut from = 0;
    while let Some(pos) = upper[from..].find(needle) {
        let start = from + pos;
        let end = start + needle.len();
        let bounded_left = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let bounded_right = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if bounded_left && bounded_right {
            return true;
        }
        from = start + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exact_canonical_code() {
        assert_eq!(resolve("RR 6ICU"), Some("RR 6ICU"));
        assert_eq!(resolve("rr ed"), Some("RR ED"));
    }

    #[test]
    fn resolves_exact_alias_case_insensitive() {
        assert_eq!(resolve("oncology"), Some("RR 6E"));
        assert_eq!(resolve("6 north"), Some("RR 6N"));
        assert_eq!(resolve("picu"), Some("SM 4CWICU"));
    }

    #[test]
    fn resolves_unit_inside_sentence() {
        assert_eq!(
            resolve("I work in the ICU, what's the hand hygiene policy?"),
            Some("RR 6ICU")
        );
        assert_eq!(
            resolve("RR 6ICU nurse, when should I change IV dressings?"),
            Some("RR 6ICU")
        );
    }

    #[test]
    fn ambiguous_alias_resolves_to_first_entry() {
        // "SURGERY" appears in several alias lists; RR 6W is defined first.
        assert_eq!(resolve("surgery"), Some("RR 6W"));
        // "ICU" is shared by every ICU unit; RR 6ICU is defined first.
        assert_eq!(resolve("icu"), Some("RR 6ICU"));
    }

    #[test]
    fn unknown_text_resolves_to_none() {
        assert_eq!(resolve("the gift shop"), None);
        assert_eq!(resolve(""), None);
    }

    #[test]
    fn short_aliases_require_whole_words() {
        // "ED" and "ER" appear inside ordinary English words; none of
        // these mention a unit.
        assert_eq!(resolve("where should restraint checks be documented?"), None);
        assert_eq!(resolve("I need help with a policy question"), None);
        assert_eq!(resolve("we used the asked-for form"), None);

        // As whole words they still resolve.
        assert_eq!(resolve("I float to the ED on weekends"), Some("RR ED"));
        assert_eq!(resolve("down in the er tonight"), Some("RR ED"));
    }

    #[test]
    fn multi_word_aliases_resolve_with_word_boundaries() {
        assert_eq!(resolve("I'm on 6 north tonight"), Some("RR 6N"));
        assert_eq!(resolve("transferred to the emergency room"), Some("RR ED"));
        // A phrase fragment inside a longer word does not count.
        assert_eq!(resolve("the 46 northbound bus"), None);
    }

    #[test]
    fn family_classification() {
        assert_eq!(UnitFamily::for_unit("RR 6ICU"), UnitFamily::IcuLike);
        assert_eq!(UnitFamily::for_unit("SM ED"), UnitFamily::EdLike);
        assert_eq!(UnitFamily::for_unit("RR ED"), UnitFamily::EdLike);
        // Unrecognized units fall back to the ICU family.
        assert_eq!(UnitFamily::for_unit("RR 7E"), UnitFamily::IcuLike);
    }
}
