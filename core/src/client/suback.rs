//! Correlation of outgoing SUBSCRIBE packets with the broker's SUBACK
//!
//! `rumqttc` hands out packet ids only when the event loop writes a request,
//! so waiters are queued in request order and bound to a packet id when the
//! matching `Outgoing::Subscribe(pkid)` event shows up.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, error, warn};

use super::error::MqttClientError;

/// Receives the broker's verdict for one subscription
pub(crate) type SubscribeReply = oneshot::Sender<Result<(), MqttClientError>>;

struct Waiter {
	filter: String,
	reply: Option<SubscribeReply>,
}

#[derive(Default)]
struct PendingInner {
	queued: VecDeque<Waiter>,
	in_flight: HashMap<u16, Waiter>,
}

/// SUBSCRIBE requests that have not been acknowledged yet
#[derive(Default)]
pub(crate) struct PendingSubscriptions {
	send_order: AsyncMutex<()>,
	inner: Mutex<PendingInner>,
}

impl PendingSubscriptions {
	/// Queues a waiter for `filter` and runs `send`, keeping waiters in the
	/// order the requests reach the event loop.
	///
	/// Without a `reply` a rejection is only logged.
	pub(crate) async fn send<Fut, E>(
		&self,
		filter: &str,
		reply: Option<SubscribeReply>,
		send: Fut,
	) -> Result<(), E>
	where
		Fut: Future<Output = Result<(), E>>,
	{
		let _order = self.send_order.lock().await;
		self.lock().queued.push_back(Waiter {
			filter: filter.to_string(),
			reply,
		});
		let sent = send.await;
		if sent.is_err() {
			self.lock().queued.pop_back();
		}
		sent
	}

	/// Binds the oldest queued waiter to the packet id the event loop used.
	pub(crate) fn sent(&self, pkid: u16) {
		let mut inner = self.lock();
		match inner.queued.pop_front() {
			| Some(waiter) => {
				debug!(pkid, filter = %waiter.filter, "Subscribe request sent");
				inner.in_flight.insert(pkid, waiter);
			}
			| None => debug!(pkid, "Subscribe sent without a waiting request"),
		}
	}

	/// Resolves the waiter for `pkid`; `rejection` carries the failure code.
	pub(crate) fn acknowledged(&self, pkid: u16, rejection: Option<String>) {
		let Some(waiter) = self.lock().in_flight.remove(&pkid) else {
			debug!(pkid, "SubAck for unknown packet id");
			return;
		};
		let outcome = match rejection {
			| None => {
				debug!(pkid, filter = %waiter.filter, "Subscription acknowledged");
				Ok(())
			}
			| Some(code) => {
				error!(filter = %waiter.filter, code = %code, "Broker rejected subscription");
				Err(MqttClientError::SubscriptionRejected {
					filter: waiter.filter,
					code,
				})
			}
		};
		if let Some(reply) = waiter.reply {
			let _ = reply.send(outcome);
		}
	}

	/// Fails the waiters whose SUBSCRIBE was already written.
	///
	/// A lost connection drops those packets, while requests still queued in
	/// the client are replayed after the reconnect and keep their waiters.
	pub(crate) fn abandon_in_flight(&self) {
		let mut inner = self.lock();
		if !inner.in_flight.is_empty() {
			warn!(count = inner.in_flight.len(), "Abandoning unacknowledged subscriptions");
		}
		inner.in_flight.clear();
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		let inner = self.lock();
		inner.queued.len() + inner.in_flight.len()
	}

	fn lock(&self) -> MutexGuard<'_, PendingInner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Waits for the verdict delivered through `acked`.
pub(crate) async fn await_suback(
	filter: &str,
	acked: oneshot::Receiver<Result<(), MqttClientError>>,
) -> Result<(), MqttClientError> {
	acked
		.await
		.unwrap_or_else(|_| Err(MqttClientError::SubscriptionAbandoned {
			filter: filter.to_string(),
		}))
}
