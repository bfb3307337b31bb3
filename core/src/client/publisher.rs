//! Outbound publishing

use std::sync::Arc;

use rumqttc::QoS;
use tracing::debug;

use super::config::ProtocolVersion;
use super::error::MqttClientError;
use super::publish_options::PublishOptions;
use super::wire::{MqttWireClient, PublishRequest};
use crate::adapter::{MessageAdapter, ToPayload};
use crate::topic::Topic;

/// Publishes values through the session's wire client.
///
/// Cheap to clone; all clones share the client.
#[derive(Clone)]
pub struct MqttPublisher {
	client: Arc<dyn MqttWireClient>,
	adapter: Arc<MessageAdapter>,
}

impl MqttPublisher {
	/// Creates a publisher over a wire client.
	pub fn new(client: Arc<dyn MqttWireClient>, adapter: Arc<MessageAdapter>) -> Self {
		Self { client, adapter }
	}

	/// Encodes `payload` and publishes it to `topic`.
	///
	/// Bytes pass through, text is sent as UTF-8, and everything else is
	/// JSON encoded. MQTT 5 only options fail on an MQTT 3 client.
	pub async fn publish<P: ToPayload + Sync + ?Sized>(
		&self,
		topic: &str,
		qos: QoS,
		payload: &P,
		options: Option<PublishOptions>,
	) -> Result<(), MqttClientError> {
		let topic = Topic::parse(topic)?;
		let payload = self.adapter.encode(payload)?;
		let options = options.unwrap_or_default();

		let version = self.client.protocol_version();
		if version == ProtocolVersion::V3 {
			if let Some(option) = options.first_v5_only_option() {
				return Err(MqttClientError::UnsupportedOption { option, version });
			}
		}

		debug!(
			topic = %topic,
			qos = ?qos,
			retain = options.retain,
			payload_size = payload.len(),
			"Publishing message"
		);
		self.client
			.publish(PublishRequest {
				topic,
				qos,
				payload,
				options,
			})
			.await
	}

	/// Protocol version of the underlying client
	pub fn protocol_version(&self) -> ProtocolVersion {
		self.client.protocol_version()
	}
}

impl std::fmt::Debug for MqttPublisher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MqttPublisher")
			.field("protocol_version", &self.client.protocol_version())
			.finish()
	}
}
