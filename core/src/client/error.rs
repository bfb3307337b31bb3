//! Client, connection and session errors

use thiserror::Error;

use super::config::ProtocolVersion;
use crate::adapter::AdapterError;
use crate::connector::SessionState;
use crate::registry::ConfigurationError;
use crate::topic::{TopicFilterError, TopicNameError};

/// Failure while waiting for the broker's CONNACK
#[derive(Debug, Error)]
pub enum ConnectionEstablishmentError {
	/// MQTT 3 network or protocol failure
	#[error("Network connection failed: {0}")]
	Network(#[from] rumqttc::ConnectionError),

	/// MQTT 5 network or protocol failure
	#[error("Network connection failed: {0}")]
	NetworkV5(#[from] rumqttc::v5::ConnectionError),

	/// Broker answered with a non-success return code
	#[error("Broker rejected connection: {code}")]
	BrokerRejected {
		/// Return code as reported by the broker
		code: String,
	},
}

/// Errors that can occur in MQTT client operations
#[derive(Debug, Error)]
pub enum MqttClientError {
	/// Request could not be queued on the MQTT 3 client
	#[error("Client operation failed: {0}")]
	ClientOperation(#[from] rumqttc::ClientError),

	/// Request could not be queued on the MQTT 5 client
	#[error("Client operation failed: {0}")]
	ClientOperationV5(#[from] rumqttc::v5::ClientError),

	/// Invalid configuration parameter values
	#[error("Invalid configuration value: {0}")]
	ConfigurationValue(String),

	/// Handler registration failed
	#[error("Invalid subscriber configuration: {0}")]
	Registration(#[from] ConfigurationError),

	/// Payload could not be encoded
	#[error("Serialization error: {0}")]
	Serialization(#[from] AdapterError),

	/// Topic name rejected for publishing
	#[error("Topic error: {0}")]
	TopicName(#[from] TopicNameError),

	/// Topic filter rejected for subscribing
	#[error("Topic filter error: {0}")]
	TopicFilter(#[from] TopicFilterError),

	/// Publish option not available in the negotiated protocol version
	#[error("Publish option '{option}' requires MQTT 5, client speaks MQTT {version}")]
	UnsupportedOption {
		/// Name of the rejected option
		option: &'static str,
		/// Protocol version of the client
		version: ProtocolVersion,
	},

	/// `connect` called on a client whose event loop is already in use
	#[error("Client is already connected or connecting")]
	AlreadyConnected,

	/// Operation requires a live connection
	#[error("Client is not connected")]
	NotConnected,

	/// Broker answered a SUBSCRIBE with a failure code
	#[error("Broker rejected subscription to {filter}: {code}")]
	SubscriptionRejected {
		/// Rejected filter
		filter: String,
		/// Reason code as reported by the broker
		code: String,
	},

	/// Connection ended before the broker acknowledged a SUBSCRIBE
	#[error("Subscription to {filter} was not acknowledged before the connection ended")]
	SubscriptionAbandoned {
		/// Filter that was awaiting its SUBACK
		filter: String,
	},

	/// Connection establishment failed
	#[error("Failed to establish connection: {0}")]
	ConnectionEstablishment(#[from] ConnectionEstablishmentError),
}

/// Failure to start the session
#[derive(Debug, Error)]
pub enum BrokerConnectError {
	/// Connect plus initial subscriptions did not finish in time
	#[error("Timeout while connecting to broker after {timeout_millis}ms")]
	Timeout {
		/// Configured connect timeout
		timeout_millis: u64,
	},

	/// Connecting failed
	#[error("Failed to connect to broker {address}")]
	Connect {
		/// `host:port` of the broker
		address: String,
		/// Underlying client failure
		#[source]
		source: MqttClientError,
	},

	/// Subscribing failed
	#[error("Failed to subscribe to {filter}")]
	Subscribe {
		/// Filter that could not be subscribed
		filter: String,
		/// Underlying client failure
		#[source]
		source: MqttClientError,
	},

	/// Lifecycle operation requested in the wrong state
	#[error("Cannot {operation} while session is {state:?}")]
	InvalidState {
		/// Requested operation
		operation: &'static str,
		/// State at the time of the request
		state: SessionState,
	},
}
