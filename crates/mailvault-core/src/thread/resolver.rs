//! Multi-tier heuristic thread resolution.
//!
//! Every message gets a stable, non-null thread id from four cascading
//! strategies; the first one that yields a match wins:
//!
//! 1. reply chain (`In-Reply-To` points at a known message id)
//! 2. references chain (first `References` token matching a known id)
//! 3. conversation-index root (truncated token prefix)
//! 4. normalized-subject hash fallback
//!
//! All lookup state lives in a [`ResolverContext`] created fresh per run and
//! passed by reference through the traversal, so independent runs never
//! share mutable state.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Default truncation applied to a conversation-index token to derive its
/// root. Inherited heuristic; correctness across archive formats is
/// unverified, which is why it is configurable.
pub const DEFAULT_CONVERSATION_ROOT_LEN: usize = 22;

/// The identity fields thread resolution looks at, all optional except the
/// subject (which may still be empty).
#[derive(Debug, Default)]
pub struct ThreadKeys<'a> {
    /// Protocol-level message id.
    pub message_id: Option<&'a str>,
    /// Trimmed `In-Reply-To` value.
    pub in_reply_to: Option<&'a str>,
    /// Raw whitespace-delimited `References` value.
    pub references: Option<&'a str>,
    /// Conversation-index token (hex).
    pub conversation_index: Option<&'a str>,
    /// Message subject.
    pub subject: &'a str,
}

/// Per-run thread lookup state.
#[derive(Debug)]
pub struct ResolverContext {
    by_msgid: HashMap<String, String>,
    by_conv_root: HashMap<String, String>,
    by_subject: HashMap<String, String>,
    assigned: HashSet<String>,
    conversation_root_len: usize,
}

impl Default for ResolverContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverContext {
    /// Creates a fresh context with the default conversation-root length.
    #[must_use]
    pub fn new() -> Self {
        Self::with_conversation_root_len(DEFAULT_CONVERSATION_ROOT_LEN)
    }

    /// Creates a fresh context with a custom conversation-root length.
    #[must_use]
    pub fn with_conversation_root_len(len: usize) -> Self {
        Self {
            by_msgid: HashMap::new(),
            by_conv_root: HashMap::new(),
            by_subject: HashMap::new(),
            assigned: HashSet::new(),
            conversation_root_len: len.max(1),
        }
    }

    /// Resolves a thread id for a message. Never fails; the subject fallback
    /// guarantees an id even for a message with no identity at all.
    ///
    /// After resolution the message's own id (when present) is registered so
    /// later replies can find it through strategies 1 and 2.
    pub fn resolve(&mut self, keys: &ThreadKeys<'_>) -> String {
        // 1. Reply chain based on In-Reply-To
        let mut thread_id = keys
            .in_reply_to
            .and_then(|irt| self.by_msgid.get(irt).cloned());

        // 2. References chain: first previously-seen token wins
        if thread_id.is_none()
            && let Some(references) = keys.references
        {
            thread_id = references
                .split_whitespace()
                .find_map(|token| self.by_msgid.get(token).cloned());
        }

        // 3. Conversation index root
        if thread_id.is_none()
            && let Some(conv) = keys.conversation_index
        {
            let root: String = conv.chars().take(self.conversation_root_len).collect();
            let id = self
                .by_conv_root
                .entry(root.clone())
                .or_insert_with(|| format!("thread-{root}"))
                .clone();
            thread_id = Some(id);
        }

        // 4. Normalized subject fallback
        let thread_id = thread_id.unwrap_or_else(|| {
            let normalized = normalize_subject(keys.subject);
            self.by_subject
                .entry(normalized.clone())
                .or_insert_with(|| {
                    let digest = Sha256::digest(normalized.as_bytes());
                    let mut hex = String::with_capacity(12);
                    for byte in digest.iter().take(6) {
                        use std::fmt::Write as _;
                        let _ = write!(hex, "{byte:02x}");
                    }
                    format!("thread-{hex}")
                })
                .clone()
        });

        if let Some(message_id) = keys.message_id {
            self.by_msgid
                .insert(message_id.to_string(), thread_id.clone());
        }
        self.assigned.insert(thread_id.clone());

        thread_id
    }

    /// Number of distinct thread ids ever assigned during this run.
    #[must_use]
    pub fn threads_identified(&self) -> usize {
        self.assigned.len()
    }
}

/// Normalizes a subject for fallback threading: lower-case, strip
/// `re:`/`fw:`/`fwd:`/`aw:` prefixes, trim. An empty subject becomes the
/// literal token `"(no subject)"`.
#[must_use]
pub fn normalize_subject(subject: &str) -> String {
    let mut subject = subject.to_lowercase().trim().to_string();
    loop {
        let mut stripped = false;
        for prefix in ["re:", "fw:", "fwd:", "aw:"] {
            if let Some(rest) = subject.strip_prefix(prefix) {
                subject = rest.trim().to_string();
                stripped = true;
            }
        }
        if !stripped {
            break;
        }
    }
    if subject.is_empty() {
        "(no subject)".to_string()
    } else {
        subject
    }
}
