//! Resolution of inbound messages to subscribers and their invocation

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::{error, trace};

use super::error::MessageError;
use super::error_handler::MessageErrorHandler;
use crate::adapter::MessageAdapter;
use crate::message::InboundMessage;
use crate::registry::{ResolvedSubscriber, SubscriberRegistry};
use crate::topic::Topic;

/// Routes delivered messages to their subscriber.
///
/// Each concrete topic is resolved against the registry once; the result
/// is cached for the lifetime of the engine.
pub struct DispatchEngine {
	registry: Arc<SubscriberRegistry>,
	adapter: Arc<MessageAdapter>,
	error_handler: Arc<dyn MessageErrorHandler>,
	cache: DashMap<Topic, Arc<ResolvedSubscriber>>,
	resolutions: AtomicUsize,
}

impl DispatchEngine {
	/// Creates an engine over a populated registry.
	pub fn new(
		registry: Arc<SubscriberRegistry>,
		adapter: Arc<MessageAdapter>,
		error_handler: Arc<dyn MessageErrorHandler>,
	) -> Self {
		Self {
			registry,
			adapter,
			error_handler,
			cache: DashMap::new(),
			resolutions: AtomicUsize::new(0),
		}
	}

	/// Dispatches one message.
	///
	/// Decode and handler failures go to the error handler. A topic that
	/// matches no registered filter means the broker delivered something
	/// that was never subscribed, which is a broken invariant: it is logged
	/// and the call panics.
	pub fn handle(&self, message: InboundMessage) {
		trace!(
			topic = %message.topic(),
			payload_size = message.payload().len(),
			"Dispatching message"
		);
		let Some(subscriber) = self.subscriber_for(message.topic()) else {
			error!(topic = %message.topic(), "No subscriber found for topic");
			panic!("No subscriber found for topic {}", message.topic());
		};

		if let Err(cause) = subscriber.invoke(&message, &self.adapter) {
			self.error_handler.handle(MessageError::new(&message, cause));
		}
	}

	fn subscriber_for(&self, topic: &Topic) -> Option<Arc<ResolvedSubscriber>> {
		if let Some(hit) = self.cache.get(topic) {
			return Some(Arc::clone(hit.value()));
		}
		self.resolutions.fetch_add(1, Ordering::Relaxed);
		let resolved = self.registry.find_first_match(topic)?;
		trace!(topic = %topic, subscriber = %resolved.id(), "Resolved topic");
		// Concurrent first deliveries resolve to the same subscriber; the
		// first insert wins.
		let entry = self.cache.entry(topic.clone()).or_insert(resolved);
		Some(Arc::clone(entry.value()))
	}

	/// Number of registry scans performed (cache misses)
	pub fn resolution_count(&self) -> usize {
		self.resolutions.load(Ordering::Relaxed)
	}

	/// Number of concrete topics currently cached
	pub fn cached_topics(&self) -> usize {
		self.cache.len()
	}

	/// Registry the engine resolves against
	pub fn registry(&self) -> &Arc<SubscriberRegistry> {
		&self.registry
	}

	/// Adapter used to decode arguments
	pub fn adapter(&self) -> &Arc<MessageAdapter> {
		&self.adapter
	}
}

impl std::fmt::Debug for DispatchEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DispatchEngine")
			.field("subscribers", &self.registry.len())
			.field("cached_topics", &self.cache.len())
			.finish()
	}
}
