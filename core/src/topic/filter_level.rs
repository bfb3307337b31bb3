//! A single level of an MQTT topic filter

use std::convert::TryFrom;

use arcstr::Substr;

use super::error::TopicFilterError;

/// MQTT topic filter level: literal string or wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterLevel {
	/// Literal level, compared case-sensitively
	Literal(Substr),
	/// Single-level wildcard `+`
	SingleLevel,
	/// Multi-level wildcard `#`
	MultiLevel,
}

impl FilterLevel {
	/// Returns string representation of the level.
	pub fn as_str(&self) -> &str {
		match self {
			| FilterLevel::Literal(s) => s,
			| FilterLevel::SingleLevel => "+",
			| FilterLevel::MultiLevel => "#",
		}
	}

	/// Returns true if this level is a wildcard (+ or #).
	pub fn is_wildcard(&self) -> bool {
		matches!(self, FilterLevel::SingleLevel | FilterLevel::MultiLevel)
	}
}

impl std::fmt::Display for FilterLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl TryFrom<Substr> for FilterLevel {
	type Error = TopicFilterError;

	fn try_from(level: Substr) -> Result<Self, Self::Error> {
		let res = match level.as_str() {
			| "+" => FilterLevel::SingleLevel,
			| "#" => FilterLevel::MultiLevel,
			| _ if level.contains(['+', '#']) => {
				return Err(TopicFilterError::wildcard_usage(level.as_str()));
			}
			| _ => FilterLevel::Literal(level),
		};
		Ok(res)
	}
}
