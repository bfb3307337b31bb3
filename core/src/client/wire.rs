//! Boundary between the session logic and an MQTT protocol implementation

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::QoS;

use super::config::ProtocolVersion;
use super::error::MqttClientError;
use super::publish_options::PublishOptions;
use crate::message::InboundMessage;
use crate::topic::{Topic, TopicFilter};

/// Callback invoked for each inbound publish that matches a subscription
pub type MessageCallback = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Connection state reported by a wire client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
	/// Not connected and not trying to
	#[default]
	Disconnected,
	/// First connection attempt in progress
	Connecting,
	/// CONNACK received
	Connected,
	/// Connection lost, a reconnect will follow
	DisconnectedReconnect,
	/// Reconnect attempt in progress
	ConnectingReconnect,
}

impl ConnectionState {
	/// Returns true only for an established connection
	pub fn is_connected(&self) -> bool {
		matches!(self, ConnectionState::Connected)
	}
}

/// Username and password for CONNECT
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	/// Username
	pub username: String,
	/// Password
	pub password: String,
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Session parameters applied when connecting
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectOptions {
	/// Clean session (MQTT 3) / clean start (MQTT 5)
	pub clean_session: bool,
	/// Optional credentials
	pub credentials: Option<Credentials>,
	/// Session expiry interval, MQTT 5 only
	pub session_expiry_seconds: u32,
}

/// Broker acknowledgement of a successful connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectAck {
	/// Whether the broker resumed a stored session
	pub session_present: bool,
}

/// One outbound publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
	/// Concrete topic
	pub topic: Topic,
	/// Delivery QoS
	pub qos: QoS,
	/// Encoded payload
	pub payload: Bytes,
	/// Retain flag and MQTT 5 properties
	pub options: PublishOptions,
}

/// An MQTT client implementation the session drives.
///
/// Implementations deliver every inbound publish to the callbacks of all
/// subscriptions whose filter matches the topic, at most once per distinct
/// callback.
#[async_trait]
pub trait MqttWireClient: Send + Sync + 'static {
	/// Protocol version spoken by this client
	fn protocol_version(&self) -> ProtocolVersion;

	/// Connects and waits for the broker's acknowledgement.
	async fn connect(&self, options: ConnectOptions) -> Result<ConnectAck, MqttClientError>;

	/// Disconnects and waits for the network loop to finish.
	async fn disconnect(&self) -> Result<(), MqttClientError>;

	/// Subscribes to a filter, routing matching publishes to `callback`.
	async fn subscribe(
		&self,
		filter: &TopicFilter,
		qos: QoS,
		callback: MessageCallback,
	) -> Result<(), MqttClientError>;

	/// Publishes one message.
	async fn publish(&self, request: PublishRequest) -> Result<(), MqttClientError>;

	/// Current connection state
	fn connection_state(&self) -> ConnectionState;
}
