//! Conversation thread resolution.

mod resolver;

pub use resolver::{DEFAULT_CONVERSATION_ROOT_LEN, ResolverContext, ThreadKeys, normalize_subject};
