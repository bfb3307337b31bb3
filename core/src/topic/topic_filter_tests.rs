//! Tests for TopicFilter parsing and matching

use super::{Topic, TopicFilter, TopicFilterError};

fn check_match(filter: &str, topic: &str, expected: bool) {
	let parsed = TopicFilter::new(filter).unwrap();
	assert_eq!(
		parsed.matches(&Topic::from(topic)),
		expected,
		"filter '{filter}' vs topic '{topic}'"
	);
}

#[test]
fn test_exact_match() {
	check_match("sensors/temp", "sensors/temp", true);
	check_match("sensors/temp", "sensors/temp/1", false);
	check_match("sensors/temp", "sensors", false);
}

#[test]
fn test_case_sensitive() {
	check_match("Sensors/Temp", "sensors/temp", false);
	check_match("sensors/temp", "sensors/Temp", false);
}

#[test]
fn test_single_level_wildcard() {
	check_match("sensors/+/temp", "sensors/kitchen/temp", true);
	check_match("sensors/+/temp", "sensors/kitchen/hall/temp", false);
	check_match("sensors/+", "sensors", false);
	check_match("sensors/+", "sensors/", true);
	check_match("+", "int", true);
	check_match("+/+", "a/b", true);
}

#[test]
fn test_multi_level_wildcard() {
	check_match("sensors/#", "sensors/a/b/c", true);
	check_match("sensors/#", "sensors", true);
	check_match("sensors/#", "actuators/a", false);
	check_match("#", "anything/at/all", true);
}

#[test]
fn test_system_topics() {
	check_match("#", "$SYS/uptime", false);
	check_match("+/uptime", "$SYS/uptime", false);
	check_match("$SYS/#", "$SYS/uptime", true);
}

#[test]
fn test_shared_filter_parsing() {
	let filter = TopicFilter::new("$share/group1/jobs/+").unwrap();
	assert!(filter.is_shared());
	assert_eq!(filter.share_group(), Some("group1"));
	assert_eq!(filter.pattern(), "jobs/+");
	assert_eq!(filter.as_str(), "$share/group1/jobs/+");
	assert!(filter.matches(&Topic::from("jobs/42")));
	assert!(!filter.matches(&Topic::from("$share/group1/jobs/42")));

	let built = TopicFilter::shared("group1", "jobs/+").unwrap();
	assert_eq!(built, filter);
}

#[test]
fn test_invalid_filters() {
	assert_eq!(TopicFilter::new("").unwrap_err(), TopicFilterError::EmptyFilter);
	assert_eq!(
		TopicFilter::new("a/#/b").unwrap_err(),
		TopicFilterError::hash_position("a/#/b")
	);
	assert_eq!(
		TopicFilter::new("a/b+").unwrap_err(),
		TopicFilterError::wildcard_usage("b+")
	);
	assert!(matches!(
		TopicFilter::new("$share//a").unwrap_err(),
		TopicFilterError::InvalidShareGroup { .. }
	));
	assert!(matches!(
		TopicFilter::new("$share/g+/a").unwrap_err(),
		TopicFilterError::InvalidShareGroup { .. }
	));
	assert!(matches!(
		TopicFilter::new("$share/group").unwrap_err(),
		TopicFilterError::InvalidShareGroup { .. }
	));
	assert_eq!(
		TopicFilter::new("$share/group/").unwrap_err(),
		TopicFilterError::EmptyFilter
	);
	assert!(matches!(
		TopicFilter::new("a\0b").unwrap_err(),
		TopicFilterError::NullCharacter { .. }
	));
}

#[test]
fn test_wildcard_flags() {
	assert!(!TopicFilter::new("a/b").unwrap().has_wildcards());
	assert!(TopicFilter::new("a/+").unwrap().has_wildcards());
	assert_eq!(TopicFilter::new("a/b/#").unwrap().len(), 3);
}

#[test]
fn test_topic_name_validation() {
	assert!(Topic::parse("int").is_ok());
	assert!(Topic::parse("").is_err());
	assert!(Topic::parse("a/+").is_err());
	assert!(Topic::parse("a/#").is_err());
}
