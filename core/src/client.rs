//! Broker-facing client layer
//!
//! [`MqttWireClient`] is the seam between session logic and the protocol
//! implementation. Two `rumqttc` backed clients cover MQTT 3.1.1 and MQTT 5,
//! and [`LoopbackClient`] keeps everything in process.

pub mod builder;
pub mod config;
pub mod error;
pub mod loopback;
pub mod publish_options;
pub mod publisher;
pub(crate) mod routes;
pub mod rumqtt_v3;
pub mod rumqtt_v5;
pub(crate) mod suback;
pub mod wire;

pub use builder::{build_wire_client, ClientCustomizer};
pub use config::{MqttConfig, ProtocolVersion};
pub use error::{BrokerConnectError, ConnectionEstablishmentError, MqttClientError};
pub use loopback::LoopbackClient;
pub use publish_options::{PayloadFormat, PublishOptions};
pub use publisher::MqttPublisher;
pub use rumqtt_v3::RumqttV3Client;
pub use rumqtt_v5::RumqttV5Client;
pub use wire::{
	ConnectAck, ConnectOptions, ConnectionState, Credentials, MessageCallback, MqttWireClient,
	PublishRequest,
};
