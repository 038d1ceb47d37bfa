//! Keyword and stakeholder matching against message content.

mod keyword;
mod stakeholder;

pub use keyword::match_keywords;
pub use stakeholder::identify_stakeholders;
