//! Error types and limits for topic filters and topic names

use thiserror::Error;

/// Errors produced while parsing a subscription topic filter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicFilterError {
	/// Empty filter (or empty filter part after a shared prefix)
	#[error("Topic filter cannot be empty")]
	EmptyFilter,

	/// Hash wildcard (#) used anywhere but as the whole last level
	#[error(
		"Invalid topic filter '{filter}': # wildcard can only be the last \
		 level"
	)]
	HashPosition {
		/// The invalid filter
		filter: String,
	},

	/// Wildcard characters mixed with other characters inside a level
	#[error("Invalid wildcard usage in level '{level}'")]
	WildcardUsage {
		/// The offending level
		level: String,
	},

	/// Malformed `$share/<group>/<filter>` prefix
	#[error("Invalid shared subscription '{filter}': {reason}")]
	InvalidShareGroup {
		/// The invalid filter
		filter: String,
		/// What is wrong with the group
		reason: &'static str,
	},

	/// Filter contains a NUL character
	#[error("Topic filter '{filter}' contains a NUL character")]
	NullCharacter {
		/// The invalid filter
		filter: String,
	},

	/// Filter exceeds the protocol length limit
	#[error("Topic filter is too long: {length} > {}", limits::MAX_TOPIC_LENGTH)]
	TooLong {
		/// Filter length in bytes
		length: usize,
	},
}

impl TopicFilterError {
	/// Creates a new HashPosition error
	pub fn hash_position(filter: impl Into<String>) -> Self {
		Self::HashPosition {
			filter: filter.into(),
		}
	}

	/// Creates a new WildcardUsage error
	pub fn wildcard_usage(level: impl Into<String>) -> Self {
		Self::WildcardUsage {
			level: level.into(),
		}
	}

	/// Creates a new InvalidShareGroup error
	pub fn invalid_share_group(
		filter: impl Into<String>,
		reason: &'static str,
	) -> Self {
		Self::InvalidShareGroup {
			filter: filter.into(),
			reason,
		}
	}
}

/// Errors produced while validating a concrete topic name for publishing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicNameError {
	/// Empty topic name
	#[error("Topic name cannot be empty")]
	Empty,

	/// Topic name contains `+` or `#`
	#[error("Topic name '{topic}' must not contain wildcards")]
	Wildcard {
		/// The invalid topic
		topic: String,
	},

	/// Topic name contains a NUL character
	#[error("Topic name '{topic}' contains a NUL character")]
	NullCharacter {
		/// The invalid topic
		topic: String,
	},

	/// Topic name exceeds the protocol length limit
	#[error("Topic name is too long: {length} > {}", limits::MAX_TOPIC_LENGTH)]
	TooLong {
		/// Topic length in bytes
		length: usize,
	},
}

/// Protocol limits for topics
pub mod limits {
	/// Maximum topic (and filter) length in bytes, from the MQTT UTF-8 string encoding
	pub const MAX_TOPIC_LENGTH: usize = 65_535;

	/// Prefix that marks a shared subscription filter
	pub const SHARE_PREFIX: &str = "$share/";
}

/// Validation utilities for topic names
pub mod validation {
	use super::TopicNameError;
	use super::limits::MAX_TOPIC_LENGTH;

	/// Validates a concrete topic name used for publishing
	pub fn validate_topic_name(topic: &str) -> Result<(), TopicNameError> {
		if topic.is_empty() {
			return Err(TopicNameError::Empty);
		}
		if topic.len() > MAX_TOPIC_LENGTH {
			return Err(TopicNameError::TooLong {
				length: topic.len(),
			});
		}
		if topic.contains(['+', '#']) {
			return Err(TopicNameError::Wildcard {
				topic: topic.to_string(),
			});
		}
		if topic.contains('\0') {
			return Err(TopicNameError::NullCharacter {
				topic: topic.to_string(),
			});
		}
		Ok(())
	}
}
