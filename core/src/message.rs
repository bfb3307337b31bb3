//! Raw inbound message wrapper

use bytes::Bytes;
use rumqttc::QoS;

use crate::topic::Topic;

/// A message delivered by the wire client, as seen by the dispatch engine.
///
/// Handlers may take this type as their payload parameter to receive the
/// whole message unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
	topic: Topic,
	payload: Bytes,
	qos: QoS,
	retain: bool,
}

impl InboundMessage {
	/// Creates a QoS 0, non-retained message.
	pub fn new(topic: impl Into<Topic>, payload: impl Into<Bytes>) -> Self {
		Self {
			topic: topic.into(),
			payload: payload.into(),
			qos: QoS::AtMostOnce,
			retain: false,
		}
	}

	/// Sets the delivery QoS.
	pub fn with_qos(mut self, qos: QoS) -> Self {
		self.qos = qos;
		self
	}

	/// Sets the retain flag.
	pub fn with_retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}

	/// Concrete topic the message was published to.
	pub fn topic(&self) -> &Topic {
		&self.topic
	}

	/// Raw payload bytes.
	pub fn payload(&self) -> &Bytes {
		&self.payload
	}

	/// QoS the broker delivered the message with.
	pub fn qos(&self) -> QoS {
		self.qos
	}

	/// Whether the message was a retained message.
	pub fn retain(&self) -> bool {
		self.retain
	}
}
