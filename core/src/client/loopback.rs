//! In-process wire client for tests and local development

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::QoS;
use tokio::sync::watch;
use tracing::debug;

use super::config::ProtocolVersion;
use super::error::{ConnectionEstablishmentError, MqttClientError};
use super::routes::CallbackRoutes;
use super::wire::{
	ConnectAck, ConnectOptions, ConnectionState, MessageCallback, MqttWireClient,
	PublishRequest,
};
use crate::message::InboundMessage;
use crate::topic::TopicFilter;

/// Wire client that acts as its own broker.
///
/// Every publish is delivered to the matching subscriptions of the same
/// client, synchronously and with the publish QoS. Nothing leaves the
/// process.
pub struct LoopbackClient {
	version: ProtocolVersion,
	routes: CallbackRoutes,
	state: watch::Sender<ConnectionState>,
	connect_delay: Option<Duration>,
	refuse_connections: AtomicBool,
	rejected_filters: Mutex<Vec<String>>,
	connects: Mutex<Vec<ConnectOptions>>,
	published: Mutex<Vec<PublishRequest>>,
}

impl Default for LoopbackClient {
	fn default() -> Self {
		Self::new(ProtocolVersion::V3)
	}
}

impl LoopbackClient {
	/// Creates a disconnected loopback client.
	pub fn new(version: ProtocolVersion) -> Self {
		let (state, _) = watch::channel(ConnectionState::Disconnected);
		Self {
			version,
			routes: CallbackRoutes::default(),
			state,
			connect_delay: None,
			refuse_connections: AtomicBool::new(false),
			rejected_filters: Mutex::new(Vec::new()),
			connects: Mutex::new(Vec::new()),
			published: Mutex::new(Vec::new()),
		}
	}

	/// Delays every connect, to exercise connect timeouts.
	pub fn with_connect_delay(mut self, delay: Duration) -> Self {
		self.connect_delay = Some(delay);
		self
	}

	/// Makes subsequent connects fail as if the broker rejected them.
	pub fn refuse_connections(&self, refuse: bool) {
		self.refuse_connections.store(refuse, Ordering::SeqCst);
	}

	/// Answers subscriptions to `filter` with a NotAuthorized SUBACK.
	pub fn reject_subscriptions_to(&self, filter: impl Into<String>) {
		lock(&self.rejected_filters).push(filter.into());
	}

	/// Injects a message as if the broker had delivered it.
	pub fn deliver(&self, message: InboundMessage) -> usize {
		self.routes.deliver(message)
	}

	/// Options of every connect call, in order
	pub fn connects(&self) -> Vec<ConnectOptions> {
		lock(&self.connects).clone()
	}

	/// Distinct subscribed filters with their QoS, in order
	pub fn subscriptions(&self) -> Vec<(String, QoS)> {
		self.routes
			.filters()
			.into_iter()
			.map(|(filter, qos)| (filter.to_string(), qos))
			.collect()
	}

	/// Every accepted publish, in order
	pub fn published(&self) -> Vec<PublishRequest> {
		lock(&self.published).clone()
	}
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl MqttWireClient for LoopbackClient {
	fn protocol_version(&self) -> ProtocolVersion {
		self.version
	}

	async fn connect(&self, options: ConnectOptions) -> Result<ConnectAck, MqttClientError> {
		self.state.send_replace(ConnectionState::Connecting);
		lock(&self.connects).push(options);
		if let Some(delay) = self.connect_delay {
			tokio::time::sleep(delay).await;
		}
		if self.refuse_connections.load(Ordering::SeqCst) {
			self.state.send_replace(ConnectionState::Disconnected);
			return Err(ConnectionEstablishmentError::BrokerRejected {
				code: "NotAuthorized".to_string(),
			}
			.into());
		}
		self.state.send_replace(ConnectionState::Connected);
		debug!("Loopback client connected");
		Ok(ConnectAck {
			session_present: false,
		})
	}

	async fn disconnect(&self) -> Result<(), MqttClientError> {
		self.state.send_replace(ConnectionState::Disconnected);
		debug!("Loopback client disconnected");
		Ok(())
	}

	async fn subscribe(
		&self,
		filter: &TopicFilter,
		qos: QoS,
		callback: MessageCallback,
	) -> Result<(), MqttClientError> {
		if lock(&self.rejected_filters).iter().any(|rejected| rejected == filter.as_str()) {
			debug!(filter = %filter, "Loopback client rejecting subscription");
			return Err(MqttClientError::SubscriptionRejected {
				filter: filter.to_string(),
				code: "NotAuthorized".to_string(),
			});
		}
		self.routes.add(filter, qos, callback);
		Ok(())
	}

	async fn publish(&self, request: PublishRequest) -> Result<(), MqttClientError> {
		if !self.connection_state().is_connected() {
			return Err(MqttClientError::NotConnected);
		}
		let message = InboundMessage::new(request.topic.clone(), request.payload.clone())
			.with_qos(request.qos)
			.with_retain(request.options.retain);
		lock(&self.published).push(request);
		self.routes.deliver(message);
		Ok(())
	}

	fn connection_state(&self) -> ConnectionState {
		*self.state.borrow()
	}
}
