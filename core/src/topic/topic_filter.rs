//! Parsed MQTT topic filters

use std::fmt::{self, Display};
use std::slice::Iter;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;

use super::error::limits::{MAX_TOPIC_LENGTH, SHARE_PREFIX};
use super::error::TopicFilterError;
use super::filter_level::FilterLevel;
use super::topic_name::Topic;

/// Parsed MQTT subscription filter, optionally in shared form.
///
/// The string handed to the broker is the full filter including any
/// `$share/<group>/` prefix; matching only ever looks at the filter part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter {
	raw: ArcStr,
	share_group: Option<Substr>,
	pattern: Substr,
	levels: SmallVec<[FilterLevel; 8]>,
}

impl TopicFilter {
	/// Parses a filter such as `sensors/+/temp`, `alerts/#` or
	/// `$share/workers/jobs/+`.
	pub fn new(filter: impl Into<ArcStr>) -> Result<Self, TopicFilterError> {
		let raw = filter.into();
		if raw.len() > MAX_TOPIC_LENGTH {
			return Err(TopicFilterError::TooLong { length: raw.len() });
		}
		if raw.contains('\0') {
			return Err(TopicFilterError::NullCharacter {
				filter: raw.to_string(),
			});
		}

		let (share_group, pattern) = match raw.strip_prefix(SHARE_PREFIX) {
			| Some(rest) => {
				let (group, pattern) = rest.split_once('/').ok_or_else(|| {
					TopicFilterError::invalid_share_group(
						raw.as_str(),
						"missing filter after group name",
					)
				})?;
				if group.is_empty() {
					return Err(TopicFilterError::invalid_share_group(
						raw.as_str(),
						"group name is empty",
					));
				}
				if group.contains(['+', '#']) {
					return Err(TopicFilterError::invalid_share_group(
						raw.as_str(),
						"group name contains a wildcard",
					));
				}
				(Some(raw.substr_from(group)), raw.substr_from(pattern))
			}
			| None => (None, raw.substr(..)),
		};

		if pattern.is_empty() {
			return Err(TopicFilterError::EmptyFilter);
		}

		let levels = pattern
			.split('/')
			.map(|s| pattern.substr_from(s))
			.map(FilterLevel::try_from)
			.collect::<Result<SmallVec<[FilterLevel; 8]>, _>>()?;

		if let Some(hash_pos) =
			levels.iter().position(|l| *l == FilterLevel::MultiLevel)
		{
			if hash_pos != levels.len() - 1 {
				return Err(TopicFilterError::hash_position(raw.as_str()));
			}
		}

		Ok(Self {
			raw,
			share_group,
			pattern,
			levels,
		})
	}

	/// Builds the shared form `$share/<group>/<filter>`.
	pub fn shared(group: &str, filter: &str) -> Result<Self, TopicFilterError> {
		Self::new(format!("{SHARE_PREFIX}{group}/{filter}"))
	}

	/// Full filter as sent in SUBSCRIBE, including a shared prefix.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// Filter part without the shared prefix.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Shared subscription group, if any.
	pub fn share_group(&self) -> Option<&str> {
		self.share_group.as_deref()
	}

	/// Returns true for `$share/...` filters.
	pub fn is_shared(&self) -> bool {
		self.share_group.is_some()
	}

	/// Returns true if the filter contains `+` or `#`.
	pub fn has_wildcards(&self) -> bool {
		self.levels.iter().any(FilterLevel::is_wildcard)
	}

	/// Iterates over the parsed levels of the filter part.
	pub fn iter(&self) -> Iter<'_, FilterLevel> {
		self.levels.iter()
	}

	/// Number of levels in the filter part.
	pub fn len(&self) -> usize {
		self.levels.len()
	}

	/// A parsed filter always has at least one level.
	pub fn is_empty(&self) -> bool {
		self.levels.is_empty()
	}

	/// Tests a concrete topic against this filter.
	///
	/// `+` consumes exactly one level, `#` consumes the rest including the
	/// parent level itself (`a/#` matches `a`). Comparison is case-sensitive.
	pub fn matches(&self, topic: &Topic) -> bool {
		if topic.is_system()
			&& self.levels.first().is_some_and(FilterLevel::is_wildcard)
		{
			return false;
		}

		let mut topic_levels = topic.levels();
		for level in &self.levels {
			match level {
				| FilterLevel::Literal(expected) => match topic_levels.next() {
					| Some(actual) if actual == expected.as_str() => {}
					| _ => return false,
				},
				| FilterLevel::SingleLevel => {
					if topic_levels.next().is_none() {
						return false;
					}
				}
				| FilterLevel::MultiLevel => return true,
			}
		}
		topic_levels.next().is_none()
	}
}

impl Display for TopicFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

impl TryFrom<&str> for TopicFilter {
	type Error = TopicFilterError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		TopicFilter::new(value)
	}
}

impl TryFrom<String> for TopicFilter {
	type Error = TopicFilterError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		TopicFilter::new(value)
	}
}
