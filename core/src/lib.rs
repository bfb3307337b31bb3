//! # MQTT Dispatch Core
//!
//! Runtime pieces behind `mqtt-dispatch`: annotated handler methods are
//! registered as subscribers, inbound messages are routed to the first
//! subscriber whose filter matches, payloads are converted to the declared
//! parameter types, and handlers run on a bounded worker pool.
//!
//! ## Features
//!
//! - **Filter Matching**: MQTT wildcards (`+`, `#`) and `$share` groups
//! - **Payload Conversion**: raw bytes, UTF-8 text or JSON, chosen by parameter type
//! - **Failure Isolation**: decode errors, handler errors and panics reach an error handler
//! - **Lifecycle**: connect with timeout, ordered shutdown, graceful or immediate draining
//! - **Protocols**: MQTT 3.1.1 and MQTT 5 through `rumqttc`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mqtt_dispatch_core::prelude::*;
//! use mqtt_dispatch_core::registry::{Invoker, ParamSpec, SubscriberMethod, Subscription};
//!
//! struct Logger;
//!
//! impl MqttHandler for Logger {
//!     fn subscriber_methods(self: Arc<Self>) -> Vec<SubscriberMethod> {
//!         vec![SubscriberMethod::new(
//!             "on_temperature",
//!             Subscription::new("sensors/+/temperature", QoS::AtLeastOnce),
//!             vec![ParamSpec::of::<f64>()],
//!             Invoker::blocking(|message, adapter| {
//!                 let celsius: f64 = adapter.decode(message)?;
//!                 println!("{} -> {celsius}", message.topic());
//!                 Ok(())
//!             }),
//!         )]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = MqttRuntime::builder(MqttConfig::from_env()?)
//!         .handler(Arc::new(Logger))
//!         .build()?;
//!     runtime.start().await?;
//!
//!     runtime
//!         .publisher()
//!         .publish("sensors/kitchen/temperature", QoS::AtLeastOnce, &21.5, None)
//!         .await?;
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! Handlers are normally declared with the `#[mqtt_handler]` attribute from
//! `mqtt-dispatch`, which generates the [`MqttHandler`] impl above.

#![warn(missing_docs)]

pub mod adapter;
pub mod client;
pub mod connector;
pub mod dispatch;
pub mod executor;
pub mod message;
pub mod registry;
pub mod runtime;
pub mod topic;

// === Core Public API ===
pub use adapter::{FromMqttMessage, Json, MessageAdapter, ParamKind, ToPayload};
pub use client::{
	BrokerConnectError, ClientCustomizer, MqttClientError, MqttConfig, MqttPublisher,
	ProtocolVersion, PublishOptions,
};
pub use connector::{Health, HealthStatus, SessionState};
pub use dispatch::{LoggingErrorHandler, MessageError, MessageErrorHandler, MessageErrorKind};
pub use executor::ShutdownPolicy;
pub use message::InboundMessage;
pub use registry::{ConfigurationError, MqttHandler};
pub use runtime::{MqttRuntime, MqttRuntimeBuilder};
pub use topic::{Topic, TopicFilter};
// Essential external types
pub use bytes::Bytes;
pub use futures::future::BoxFuture;
pub use rumqttc::QoS;

/// Result type alias for operations that may fail with MqttClientError
pub type Result<T> = std::result::Result<T, MqttClientError>;

/// Prelude module for convenient imports
///
/// Essential types for most applications:
///
/// ```rust
/// use mqtt_dispatch_core::prelude::*;
/// ```
pub mod prelude {
	pub use crate::{
		Bytes, InboundMessage, Json, MessageError, MqttConfig, MqttHandler, MqttPublisher,
		MqttRuntime, PublishOptions, QoS, Topic,
	};
}

/// Building blocks for custom wiring
///
/// Everything [`MqttRuntime`] assembles, for callers that wire the pieces
/// themselves or plug in another wire client.
///
/// ```rust
/// use mqtt_dispatch_core::advanced::*;
/// ```
pub mod advanced {
	pub use crate::client::{
		build_wire_client, ConnectAck, ConnectOptions, ConnectionState, Credentials,
		LoopbackClient, MessageCallback, MqttWireClient, PayloadFormat, PublishRequest,
		RumqttV3Client, RumqttV5Client,
	};
	pub use crate::connector::{Connector, ConnectorSettings};
	pub use crate::dispatch::DispatchEngine;
	pub use crate::executor::{ExecutionPool, ExecutorSettings};
	pub use crate::registry::{
		Invoker, ParamSpec, ResolvedSubscriber, SubscriberMethod, SubscriberRegistry,
		Subscription,
	};
	pub use crate::topic::{limits, validation, FilterLevel, TopicMatcherNode};
}

/// Error types used throughout the library
///
/// ```rust
/// use mqtt_dispatch_core::errors::*;
/// ```
pub mod errors {
	pub use crate::adapter::AdapterError;
	pub use crate::client::ConnectionEstablishmentError;
	pub use crate::dispatch::DispatchError;
	pub use crate::executor::RejectedExecution;
	pub use crate::registry::InvalidSubscriber;
	pub use crate::topic::{TopicFilterError, TopicNameError};
	pub use crate::{BrokerConnectError, ConfigurationError, MqttClientError};
}
