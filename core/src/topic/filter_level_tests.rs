//! Tests for FilterLevel parsing

use arcstr::Substr;

use super::{FilterLevel, TopicFilterError};

#[test]
fn test_literal_level() {
	let level = FilterLevel::try_from(Substr::from("sensors")).unwrap();

	assert_eq!(level, FilterLevel::Literal(Substr::from("sensors")));
	assert_eq!(level.as_str(), "sensors");
	assert!(!level.is_wildcard());
}

#[test]
fn test_wildcard_levels() {
	let plus = FilterLevel::try_from(Substr::from("+")).unwrap();
	let hash = FilterLevel::try_from(Substr::from("#")).unwrap();

	assert_eq!(plus, FilterLevel::SingleLevel);
	assert_eq!(hash, FilterLevel::MultiLevel);
	assert!(plus.is_wildcard());
	assert!(hash.is_wildcard());
	assert_eq!(hash.to_string(), "#");
}

#[test]
fn test_empty_level_is_literal() {
	// "a//b" has a legal empty level in the middle
	let level = FilterLevel::try_from(Substr::from("")).unwrap();
	assert_eq!(level, FilterLevel::Literal(Substr::from("")));
}

#[test]
fn test_mixed_wildcards_rejected() {
	for level in ["temp+", "+temp", "a#", "#b", "+#"] {
		let err = FilterLevel::try_from(Substr::from(level)).unwrap_err();
		assert_eq!(err, TopicFilterError::wildcard_usage(level), "{level}");
	}
}
