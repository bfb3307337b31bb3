//! Validated store of subscriber methods

use std::sync::Arc;

use tracing::debug;

use super::error::{ConfigurationError, InvalidSubscriber};
use super::subscriber::{MqttHandler, ResolvedSubscriber, Subscription};
use crate::topic::{Topic, TopicFilter, TopicFilterError};

/// All subscribers discovered at startup, in registration order.
///
/// Built once before the session connects and read-only afterwards.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
	shared_group: Option<String>,
	subscribers: Vec<Arc<ResolvedSubscriber>>,
}

impl SubscriberRegistry {
	/// Creates an empty registry. Subscriptions that request the shared form
	/// get the `$share/<group>/` prefix only when a group is given.
	pub fn new(shared_group: Option<String>) -> Self {
		Self {
			shared_group,
			subscribers: Vec::new(),
		}
	}

	/// Configured shared subscription group
	pub fn shared_group(&self) -> Option<&str> {
		self.shared_group.as_deref()
	}

	/// Registers every subscriber method of a handler.
	///
	/// Methods are processed in method-name order. If any method has an
	/// invalid signature or filter, none of them is registered and the error
	/// names all offending methods.
	pub fn register<H: MqttHandler + ?Sized>(
		&mut self,
		handler: Arc<H>,
	) -> Result<usize, ConfigurationError> {
		let handler_name = handler.handler_name();
		let mut methods = handler.subscriber_methods();
		methods.sort_by(|a, b| a.name().cmp(b.name()));

		let mut invalid = Vec::new();
		let mut resolved = Vec::with_capacity(methods.len());
		for method in methods {
			let id = format!("{handler_name}::{}", method.name());
			if let Some(reason) = method.signature_problem() {
				invalid.push(InvalidSubscriber {
					method: id,
					reason: reason.to_string(),
				});
				continue;
			}
			match self.resolve_filter(method.subscription()) {
				| Ok(filter) => resolved.push((filter, method)),
				| Err(err) => invalid.push(InvalidSubscriber {
					method: id,
					reason: err.to_string(),
				}),
			}
		}

		if !invalid.is_empty() {
			return Err(ConfigurationError {
				handler: handler_name.to_string(),
				invalid,
			});
		}

		let count = resolved.len();
		for (filter, method) in resolved {
			let (name, subscription, params, invoker) = method.into_parts();
			debug!(
				handler = handler_name,
				method = %name,
				filter = %filter,
				qos = ?subscription.qos(),
				"Found subscriber"
			);
			self.subscribers.push(Arc::new(ResolvedSubscriber::new(
				handler_name,
				name,
				filter,
				subscription.qos(),
				params,
				invoker,
			)));
		}
		Ok(count)
	}

	fn resolve_filter(
		&self,
		subscription: &Subscription,
	) -> Result<TopicFilter, TopicFilterError> {
		match (&self.shared_group, subscription.is_shared()) {
			| (Some(group), true) => TopicFilter::shared(group, subscription.topic()),
			| _ => TopicFilter::new(subscription.topic()),
		}
	}

	/// Subscribers in registration order
	pub fn subscribers(&self) -> &[Arc<ResolvedSubscriber>] {
		&self.subscribers
	}

	/// First subscriber, in registration order, whose filter matches the topic
	pub fn find_first_match(&self, topic: &Topic) -> Option<Arc<ResolvedSubscriber>> {
		self.subscribers.iter().find(|s| s.matches(topic)).cloned()
	}

	/// Number of registered subscribers
	pub fn len(&self) -> usize {
		self.subscribers.len()
	}

	/// Returns true if nothing was registered
	pub fn is_empty(&self) -> bool {
		self.subscribers.is_empty()
	}
}
