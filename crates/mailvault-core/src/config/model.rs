//! Keyword and stakeholder configuration models.
//!
//! Both lists are loaded once per run (from the index database or supplied
//! directly by the caller) and are immutable for the duration of the run.

use serde::{Deserialize, Serialize};

/// A labeled concept to tag messages with, plus its alternate surface forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    /// Display label; the dedup key for matches.
    pub label: String,
    /// Lower-cased primary needle.
    pub needle: String,
    /// Lower-cased variations that also count as a match.
    pub variations: Vec<String>,
}

impl Keyword {
    /// Builds a keyword from a configured name and comma-separated
    /// variations, the shape the `keywords` table stores.
    #[must_use]
    pub fn from_row(name: &str, variations_csv: &str) -> Self {
        let variations = variations_csv
            .split(',')
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();
        Self {
            label: name.to_string(),
            needle: name.to_lowercase(),
            variations,
        }
    }
}

/// A known participant from the configured roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    /// Participant name.
    pub name: String,
    /// Lower-cased email address.
    pub email: String,
    /// Role description.
    pub role: String,
    /// Display string reported for matches.
    pub display: String,
}

impl Stakeholder {
    /// Builds a stakeholder from a roster row, deriving the display string
    /// from the first non-empty of name, email, role.
    #[must_use]
    pub fn from_row(name: &str, email: &str, role: &str) -> Self {
        let display = [name, email, role]
            .iter()
            .find(|v| !v.trim().is_empty())
            .map_or("Stakeholder", |v| *v)
            .to_string();
        Self {
            name: name.to_string(),
            email: email.trim().to_lowercase(),
            role: role.to_string(),
            display,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_from_row() {
        let kw = Keyword::from_row("Delay", "postponement, Hold-up , ");
        assert_eq!(kw.label, "Delay");
        assert_eq!(kw.needle, "delay");
        assert_eq!(kw.variations, vec!["postponement", "hold-up"]);
    }

    #[test]
    fn test_stakeholder_display_fallbacks() {
        assert_eq!(
            Stakeholder::from_row("Jane", "JANE@X.COM", "Engineer").display,
            "Jane"
        );
        assert_eq!(
            Stakeholder::from_row("", "jane@x.com", "Engineer").display,
            "jane@x.com"
        );
        assert_eq!(Stakeholder::from_row("", "", "Engineer").display, "Engineer");
        assert_eq!(Stakeholder::from_row("", "", "").display, "Stakeholder");
    }

    #[test]
    fn test_stakeholder_email_lowered() {
        let s = Stakeholder::from_row("Jane", " Jane@X.com ", "");
        assert_eq!(s.email, "jane@x.com");
    }
}
