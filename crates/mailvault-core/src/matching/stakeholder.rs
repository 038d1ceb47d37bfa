//! Stakeholder roster matching against message participants.

use crate::config::Stakeholder;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    Regex::new(r"[\w.+-]+@[\w.-]+").unwrap()
});

/// Matches the configured roster against sender/to/cc display strings.
///
/// Display strings are split on `;`/`,` into lower-cased tokens, and bare
/// addresses are additionally extracted from each token. A stakeholder
/// matches when its email is in the extracted address set, or its
/// lower-cased name appears as a substring of any token.
///
/// Returns the sorted, deduplicated set of display names.
#[must_use]
pub fn identify_stakeholders(
    sender: Option<&str>,
    to_addresses: Option<&str>,
    cc_addresses: Option<&str>,
    roster: &[Stakeholder],
) -> Vec<String> {
    if roster.is_empty() {
        return Vec::new();
    }

    let (emails, tokens) = extract_addresses(&[sender, to_addresses, cc_addresses]);

    let mut matched = BTreeSet::new();
    for stakeholder in roster {
        if !stakeholder.email.is_empty() && emails.contains(&stakeholder.email) {
            matched.insert(stakeholder.display.clone());
            continue;
        }
        let name_lower = stakeholder.name.to_lowercase();
        if !name_lower.is_empty() && tokens.iter().any(|t| t.contains(&name_lower)) {
            matched.insert(stakeholder.display.clone());
        }
    }

    matched.into_iter().collect()
}

/// Splits display strings into lower-cased tokens and extracts bare email
/// addresses from each.
fn extract_addresses(fields: &[Option<&str>]) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut emails = BTreeSet::new();
    let mut tokens = BTreeSet::new();

    for field in fields.iter().flatten() {
        for part in field.split([';', ',']) {
            let cleaned = part.trim();
            if cleaned.is_empty() {
                continue;
            }
            let lower = cleaned.to_lowercase();
            for m in EMAIL_PATTERN.find_iter(&lower) {
                emails.insert(m.as_str().to_string());
            }
            tokens.insert(lower);
        }
    }

    (emails, tokens)
}
