//! Topic filters, concrete topic names and filter matching
//!
//! Filters follow MQTT subscription syntax, including the
//! `$share/<group>/<filter>` form for shared subscriptions.

pub mod error;
pub mod filter_level;
pub mod topic_filter;
pub mod topic_matcher;
pub mod topic_name;

#[cfg(test)]
mod filter_level_tests;
#[cfg(test)]
mod topic_filter_tests;

pub use error::{limits, validation, TopicFilterError, TopicNameError};
pub use filter_level::FilterLevel;
pub use topic_filter::TopicFilter;
pub use topic_matcher::TopicMatcherNode;
pub use topic_name::Topic;
