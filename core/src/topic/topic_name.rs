//! Concrete topic names carried by inbound messages

use std::fmt;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;

use super::error::TopicNameError;
use super::validation::validate_topic_name;

/// A concrete MQTT topic name such as `sensors/kitchen/temperature`.
///
/// Cheap to clone; used as the dispatch cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(ArcStr);

impl Topic {
	/// Wraps a topic name received from the broker without validation.
	pub fn new(name: impl Into<ArcStr>) -> Self {
		Self(name.into())
	}

	/// Validates and wraps a topic name intended for publishing.
	pub fn parse(name: impl Into<ArcStr>) -> Result<Self, TopicNameError> {
		let name = name.into();
		validate_topic_name(&name)?;
		Ok(Self(name))
	}

	/// Returns the topic as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns the underlying shared string.
	pub fn as_arcstr(&self) -> &ArcStr {
		&self.0
	}

	/// Iterates over the `/`-separated levels.
	pub fn levels(&self) -> impl Iterator<Item = &str> {
		self.0.split('/')
	}

	/// Levels as shared substrings of this topic, for trie lookups.
	pub fn segments(&self) -> SmallVec<[Substr; 8]> {
		self.0.split('/').map(|s| self.0.substr_from(s)).collect()
	}

	/// System topics start with `$` and are never matched by a leading wildcard.
	pub fn is_system(&self) -> bool {
		self.0.starts_with('$')
	}
}

impl fmt::Display for Topic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for Topic {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<&str> for Topic {
	fn from(value: &str) -> Self {
		Self(ArcStr::from(value))
	}
}

impl From<String> for Topic {
	fn from(value: String) -> Self {
		Self(ArcStr::from(value))
	}
}

impl From<ArcStr> for Topic {
	fn from(value: ArcStr) -> Self {
		Self(value)
	}
}
