//! Run configuration: keyword and stakeholder lists.

mod model;

pub use model::{Keyword, Stakeholder};
