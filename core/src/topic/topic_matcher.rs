//! Filter trie for routing concrete topics

use std::collections::HashMap;

use arcstr::Substr;

use super::filter_level::FilterLevel;
use super::topic_filter::TopicFilter;
use super::topic_name::Topic;

/// Node in the topic matching tree, keyed by filter levels.
///
/// Wire clients keep one tree per connection to route inbound publishes to
/// the callbacks registered for each filter.
#[derive(Debug)]
pub struct TopicMatcherNode<T> {
	/// Data for filters ending exactly at this node
	exact_match_data: Option<T>,

	/// Children for literal next levels
	exact_children: HashMap<Substr, TopicMatcherNode<T>>,

	/// Child for a `+` next level
	single_level_wildcard_node: Option<Box<TopicMatcherNode<T>>>,

	/// Data for a `#` next level
	multi_level_wildcard_data: Option<T>,
}

impl<T: Default> Default for TopicMatcherNode<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Default> TopicMatcherNode<T> {
	/// Creates a new empty node
	pub fn new() -> Self {
		Self {
			exact_match_data: None,
			exact_children: HashMap::new(),
			single_level_wildcard_node: None,
			multi_level_wildcard_data: None,
		}
	}

	/// Returns true if no filter has been inserted below this node
	pub fn is_empty(&self) -> bool {
		self.exact_match_data.is_none()
			&& self.exact_children.is_empty()
			&& self.single_level_wildcard_node.is_none()
			&& self.multi_level_wildcard_data.is_none()
	}

	/// Finds or creates the data slot for a filter (shared prefix ignored)
	pub fn get_or_create(&mut self, filter: &TopicFilter) -> &mut T {
		let mut current_node = self;

		for level in filter.iter() {
			match level {
				| FilterLevel::Literal(s) => {
					current_node =
						current_node.exact_children.entry(s.clone()).or_default()
				}
				| FilterLevel::SingleLevel => {
					current_node = current_node
						.single_level_wildcard_node
						.get_or_insert_with(|| Box::new(TopicMatcherNode::new()))
				}
				| FilterLevel::MultiLevel => {
					// `#` is always the last level
					return current_node
						.multi_level_wildcard_data
						.get_or_insert_with(T::default);
				}
			}
		}
		current_node.exact_match_data.get_or_insert_with(T::default)
	}

	fn collect_matching<'a>(
		&'a self,
		topic: &[Substr],
		at_root: bool,
		matching_data: &mut Vec<&'a T>,
	) {
		match topic {
			| [] => {
				matching_data.extend(self.exact_match_data.iter());
				// `a/#` also matches `a`
				matching_data.extend(self.multi_level_wildcard_data.iter());
			}
			| [segment, remaining @ ..] => {
				if let Some(child) = self.exact_children.get(segment) {
					child.collect_matching(remaining, false, matching_data);
				}
				if at_root && segment.starts_with('$') {
					return;
				}
				if let Some(plus_node) = &self.single_level_wildcard_node {
					plus_node.collect_matching(remaining, false, matching_data);
				}
				matching_data.extend(self.multi_level_wildcard_data.iter());
			}
		}
	}

	/// Finds all data entries whose filters match the given topic
	pub fn find_by_topic<'a>(&'a self, topic: &Topic) -> Vec<&'a T> {
		let mut matching = Vec::new();
		self.collect_matching(&topic.segments(), true, &mut matching);
		matching
	}
}
