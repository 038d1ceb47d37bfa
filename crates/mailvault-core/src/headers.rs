//! Transport-header normalization.
//!
//! Takes the raw header blob an archive message carries (which may be absent
//! or damaged) and exposes the handful of extractions threading needs. An
//! unparsable blob yields an empty mapping, never an error.

use mailvault_archive::Headers;

/// Normalized view over a message's transport headers.
#[derive(Debug, Default)]
pub struct MessageHeaders {
    headers: Headers,
}

impl MessageHeaders {
    /// Parses a raw transport-header blob. `None` or garbage input yields an
    /// empty mapping.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let headers = raw.map(Headers::parse).unwrap_or_default();
        Self { headers }
    }

    /// Gets a header value by lower-cased name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The protocol-level message id: prefers the archive's native field,
    /// falls back to the `Message-Id` header. Trimmed; `None` when absent
    /// everywhere.
    #[must_use]
    pub fn message_id(&self, native: Option<&str>) -> Option<String> {
        native
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.headers.get("message-id"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// The trimmed `In-Reply-To` header, or `None`.
    #[must_use]
    pub fn in_reply_to(&self) -> Option<String> {
        self.headers
            .get("in-reply-to")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// The raw `References` header, or `None`.
    #[must_use]
    pub fn references(&self) -> Option<String> {
        self.headers
            .get("references")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
