use std::sync::{Arc, PoisonError, RwLock};

use rumqttc::QoS;
use tracing::debug;

use super::wire::MessageCallback;
use crate::message::InboundMessage;
use crate::topic::{TopicFilter, TopicMatcherNode};

#[derive(Default)]
struct RoutesInner {
	tree: TopicMatcherNode<Vec<MessageCallback>>,
	filters: Vec<(TopicFilter, QoS)>,
}

/// Subscription callbacks of one wire client, looked up per inbound topic.
#[derive(Default)]
pub(crate) struct CallbackRoutes {
	inner: RwLock<RoutesInner>,
}

impl CallbackRoutes {
	/// Routes `filter` to `callback`; returns false if that pair is already
	/// routed.
	///
	/// Each filter is resubscribed once, with the highest QoS requested for it.
	pub(crate) fn add(
		&self,
		filter: &TopicFilter,
		qos: QoS,
		callback: MessageCallback,
	) -> bool {
		let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
		match inner.filters.iter_mut().find(|(known, _)| known == filter) {
			| Some((_, known_qos)) => {
				if qos > *known_qos {
					*known_qos = qos;
				}
			}
			| None => inner.filters.push((filter.clone(), qos)),
		}
		let callbacks = inner.tree.get_or_create(filter);
		if callbacks.iter().any(|known| Arc::ptr_eq(known, &callback)) {
			debug!(filter = %filter, "Callback already routed");
			return false;
		}
		callbacks.push(callback);
		true
	}

	/// Filters in subscription order, for resubscribing after a reconnect
	pub(crate) fn filters(&self) -> Vec<(TopicFilter, QoS)> {
		self.inner
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.filters
			.clone()
	}

	/// Invokes each distinct matching callback once; returns how many ran.
	pub(crate) fn deliver(&self, message: InboundMessage) -> usize {
		let callbacks: Vec<MessageCallback> = {
			let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
			let mut unique: Vec<MessageCallback> = Vec::new();
			for callback in inner.tree.find_by_topic(message.topic()).into_iter().flatten() {
				if !unique.iter().any(|seen| Arc::ptr_eq(seen, callback)) {
					unique.push(Arc::clone(callback));
				}
			}
			unique
		};

		if callbacks.is_empty() {
			debug!(topic = %message.topic(), "No subscription matches inbound topic");
		}
		let count = callbacks.len();
		for callback in callbacks {
			callback(message.clone());
		}
		count
	}
}
