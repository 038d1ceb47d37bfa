//! Substring keyword matching.

use crate::config::Keyword;
use std::collections::BTreeSet;

/// Matches configured keywords against a message.
///
/// A keyword matches when its needle or any variation appears as a substring
/// of the combined lower-cased `subject + " " + body` text, or of any
/// lower-cased attachment filename. No word-boundary requirement.
///
/// Returns the sorted, deduplicated set of labels. Label identity is the
/// dedup key, so multiple matching variations of one keyword collapse.
#[must_use]
pub fn match_keywords(
    subject: &str,
    body: &str,
    attachment_names: &[String],
    keywords: &[Keyword],
) -> Vec<String> {
    if keywords.is_empty() {
        return Vec::new();
    }

    let combined = format!("{} {}", subject.to_lowercase(), body.to_lowercase());
    let combined = combined.trim().to_string();
    let lowered_names: Vec<String> = attachment_names
        .iter()
        .map(|n| n.to_lowercase())
        .collect();

    let mut matched = BTreeSet::new();
    for keyword in keywords {
        if keyword.label.is_empty() {
            continue;
        }
        let hit = matches_text(keyword, &combined)
            || lowered_names.iter().any(|name| matches_text(keyword, name));
        if hit {
            matched.insert(keyword.label.clone());
        }
    }

    matched.into_iter().collect()
}

fn matches_text(keyword: &Keyword, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if !keyword.needle.is_empty() && text.contains(&keyword.needle) {
        return true;
    }
    keyword.variations.iter().any(|v| text.contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<Keyword> {
        vec![
            Keyword::from_row("Delay", "postponement"),
            Keyword::from_row("Payment", "invoice, remittance"),
        ]
    }

    #[test]
    fn test_variation_matches_case_insensitively() {
        let matched = match_keywords("Project POSTPONEMENT notice", "", &[], &keywords());
        assert_eq!(matched, vec!["Delay"]);
    }

    #[test]
    fn test_needle_matches_in_body() {
        let matched = match_keywords("Update", "the delay is now three weeks", &[], &keywords());
        assert_eq!(matched, vec!["Delay"]);
    }

    #[test]
    fn test_attachment_filename_matches() {
        let names = vec!["Invoice_2024_003.pdf".to_string()];
        let matched = match_keywords("nothing here", "or here", &names, &keywords());
        assert_eq!(matched, vec!["Payment"]);
    }

    #[test]
    fn test_labels_sorted_and_deduplicated() {
        let matched = match_keywords(
            "invoice delay",
            "postponement of the remittance",
            &[],
            &keywords(),
        );
        assert_eq!(matched, vec!["Delay", "Payment"]);
    }

    #[test]
    fn test_no_keywords_no_matches() {
        assert!(match_keywords("delay", "delay", &[], &[]).is_empty());
    }

    #[test]
    fn test_substring_without_word_boundary() {
        let matched = match_keywords("undelayed", "", &[], &keywords());
        assert_eq!(matched, vec!["Delay"]);
    }
}
