//! MQTT 3.1.1 wire client backed by `rumqttc`

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::Event::{Incoming, Outgoing};
use rumqttc::{
	AsyncClient, ConnAck, ConnectReturnCode, EventLoop, MqttOptions, Packet, QoS, SubAck,
	SubscribeReasonCode,
};
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::config::ProtocolVersion;
use super::error::{ConnectionEstablishmentError, MqttClientError};
use super::routes::CallbackRoutes;
use super::suback::{await_suback, PendingSubscriptions};
use super::wire::{
	ConnectAck, ConnectOptions, ConnectionState, MessageCallback, MqttWireClient,
	PublishRequest,
};
use crate::message::InboundMessage;
use crate::topic::TopicFilter;

const MAX_CONSECUTIVE_ERRORS: u32 = 10;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// `rumqttc` MQTT 3.1.1 client.
///
/// The event loop is polled inside `connect` until CONNACK and then moved to
/// a background task that routes publishes and handles reconnects.
pub struct RumqttV3Client {
	client: AsyncClient,
	event_loop: AsyncMutex<Option<EventLoop>>,
	event_loop_task: Mutex<Option<JoinHandle<EventLoop>>>,
	routes: Arc<CallbackRoutes>,
	pending: Arc<PendingSubscriptions>,
	state: Arc<watch::Sender<ConnectionState>>,
}

impl RumqttV3Client {
	/// Creates a client; nothing touches the network until `connect`.
	pub fn new(options: MqttOptions, capacity: usize) -> Self {
		let (client, event_loop) = AsyncClient::new(options, capacity);
		let (state, _) = watch::channel(ConnectionState::Disconnected);
		Self {
			client,
			event_loop: AsyncMutex::new(Some(event_loop)),
			event_loop_task: Mutex::new(None),
			routes: Arc::new(CallbackRoutes::default()),
			pending: Arc::new(PendingSubscriptions::default()),
			state: Arc::new(state),
		}
	}

	/// Observes connection state changes.
	pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
		self.state.subscribe()
	}

	async fn establish_connection(
		event_loop: &mut EventLoop,
		pending: &PendingSubscriptions,
	) -> Result<bool, ConnectionEstablishmentError> {
		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					session_present,
					code,
				}))) => {
					if code == ConnectReturnCode::Success {
						debug!(session_present, "MQTT connection established successfully");
						return Ok(session_present);
					}
					debug!(code = ?code, "MQTT connection rejected by broker");
					return Err(ConnectionEstablishmentError::BrokerRejected {
						code: format!("{code:?}"),
					});
				}
				| Ok(Outgoing(rumqttc::Outgoing::Subscribe(pkid))) => pending.sent(pkid),
				| Ok(Incoming(Packet::SubAck(ack))) => {
					pending.acknowledged(ack.pkid, suback_rejection(&ack))
				}
				| Ok(notification) => {
					debug!(notification = ?notification, "Bootstrap phase notification");
				}
				| Err(connection_err) => {
					debug!(error = %connection_err, "MQTT connection error during bootstrap phase");
					return Err(ConnectionEstablishmentError::Network(connection_err));
				}
			}
		}
	}

	/// Routes publishes until a Disconnect packet is seen or too many
	/// consecutive errors occur.
	async fn run(
		mut event_loop: EventLoop,
		client: AsyncClient,
		routes: Arc<CallbackRoutes>,
		pending: Arc<PendingSubscriptions>,
		state: Arc<watch::Sender<ConnectionState>>,
	) -> EventLoop {
		let mut error_count = 0;

		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					session_present,
					code: ConnectReturnCode::Success,
				}))) => {
					error_count = 0;
					state.send_replace(ConnectionState::Connected);
					info!(session_present, "Connected to broker.");
					if !session_present {
						resubscribe(client.clone(), &routes, Arc::clone(&pending));
					}
				}
				| Ok(Incoming(Packet::Publish(p))) => {
					error_count = 0;
					debug!(topic = %p.topic, payload_size = p.payload.len(), "Received MQTT message");
					let message = InboundMessage::new(p.topic, p.payload)
						.with_qos(p.qos)
						.with_retain(p.retain);
					routes.deliver(message);
				}
				| Ok(Incoming(Packet::Disconnect)) => {
					info!("Received MQTT Disconnect packet from server");
					break;
				}
				| Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
					info!("Sent MQTT Disconnect packet to server");
					break;
				}
				| Ok(Outgoing(rumqttc::Outgoing::Subscribe(pkid))) => {
					error_count = 0;
					pending.sent(pkid);
				}
				| Ok(Incoming(Packet::SubAck(ack))) => {
					error_count = 0;
					pending.acknowledged(ack.pkid, suback_rejection(&ack));
				}
				| Ok(notification) => {
					error_count = 0;
					debug!(notification = ?notification, "Received MQTT notification");
				}
				| Err(err) => {
					error_count += 1;
					pending.abandon_in_flight();
					state.send_replace(ConnectionState::DisconnectedReconnect);
					warn!(error_count, error = %err, "Disconnected from broker, reconnecting...");

					if error_count >= MAX_CONSECUTIVE_ERRORS {
						error!(
							error_count,
							max_errors = MAX_CONSECUTIVE_ERRORS,
							"Too many consecutive errors, terminating event loop"
						);
						break;
					}

					let delay = INITIAL_RETRY_DELAY * 2_u32.pow((error_count - 1).min(10));
					time::sleep(delay.min(MAX_RETRY_DELAY)).await;
					state.send_replace(ConnectionState::ConnectingReconnect);
				}
			}
		}
		pending.abandon_in_flight();
		state.send_replace(ConnectionState::Disconnected);
		info!("MQTT event loop terminated");
		event_loop
	}
}

/// Re-issues every subscription on a separate task; the event loop must keep
/// polling for the requests to drain.
fn resubscribe(
	client: AsyncClient,
	routes: &CallbackRoutes,
	pending: Arc<PendingSubscriptions>,
) {
	let filters = routes.filters();
	info!(count = filters.len(), "Session not present, resubscribing to all filters");
	tokio::spawn(async move {
		for (filter, qos) in filters {
			let request = client.subscribe(filter.as_str(), qos);
			if let Err(err) = pending.send(filter.as_str(), None, request).await {
				error!(filter = %filter, error = %err, "Failed to resubscribe");
			}
		}
	});
}

/// First failure code of a SUBACK, if any
fn suback_rejection(ack: &SubAck) -> Option<String> {
	ack.return_codes
		.iter()
		.find(|code| !matches!(code, SubscribeReasonCode::Success(_)))
		.map(|code| format!("{code:?}"))
}

#[async_trait]
impl MqttWireClient for RumqttV3Client {
	fn protocol_version(&self) -> ProtocolVersion {
		ProtocolVersion::V3
	}

	async fn connect(&self, options: ConnectOptions) -> Result<ConnectAck, MqttClientError> {
		// Held across the handshake so a cancelled connect leaves the event
		// loop in place for the next attempt.
		let mut slot = self.event_loop.lock().await;
		let Some(event_loop) = slot.as_mut() else {
			return Err(MqttClientError::AlreadyConnected);
		};
		event_loop.mqtt_options.set_clean_session(options.clean_session);
		if let Some(credentials) = options.credentials {
			event_loop
				.mqtt_options
				.set_credentials(credentials.username, credentials.password);
		}

		self.state.send_replace(ConnectionState::Connecting);
		let session_present = match Self::establish_connection(event_loop, &self.pending).await {
			| Ok(session_present) => session_present,
			| Err(err) => {
				self.state.send_replace(ConnectionState::Disconnected);
				return Err(err.into());
			}
		};
		let Some(event_loop) = slot.take() else {
			return Err(MqttClientError::AlreadyConnected);
		};
		self.state.send_replace(ConnectionState::Connected);
		info!("Connected to broker.");

		let task = tokio::spawn(Self::run(
			event_loop,
			self.client.clone(),
			Arc::clone(&self.routes),
			Arc::clone(&self.pending),
			Arc::clone(&self.state),
		));
		*self
			.event_loop_task
			.lock()
			.unwrap_or_else(PoisonError::into_inner) = Some(task);
		Ok(ConnectAck { session_present })
	}

	async fn disconnect(&self) -> Result<(), MqttClientError> {
		let task = self
			.event_loop_task
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		let Some(task) = task else {
			self.state.send_replace(ConnectionState::Disconnected);
			return Ok(());
		};
		if !task.is_finished() {
			if let Err(err) = self.client.disconnect().await {
				debug!(error = %err, "Disconnect request not delivered");
			}
		}
		match task.await {
			| Ok(event_loop) => *self.event_loop.lock().await = Some(event_loop),
			| Err(err) => warn!(error = %err, "Event loop task failed"),
		}
		self.state.send_replace(ConnectionState::Disconnected);
		Ok(())
	}

	async fn subscribe(
		&self,
		filter: &TopicFilter,
		qos: QoS,
		callback: MessageCallback,
	) -> Result<(), MqttClientError> {
		self.routes.add(filter, qos, callback);
		let (reply, acked) = oneshot::channel();
		let request = self.client.subscribe(filter.as_str(), qos);
		self.pending.send(filter.as_str(), Some(reply), request).await?;
		await_suback(filter.as_str(), acked).await
	}

	async fn publish(&self, request: PublishRequest) -> Result<(), MqttClientError> {
		self.client
			.publish(
				request.topic.as_str(),
				request.qos,
				request.options.retain,
				request.payload.to_vec(),
			)
			.await?;
		Ok(())
	}

	fn connection_state(&self) -> ConnectionState {
		*self.state.borrow()
	}
}
