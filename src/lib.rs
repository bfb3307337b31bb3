//! # MQTT Dispatch
//!
//! Annotation-driven MQTT subscribers on top of `rumqttc`.
//!
//! Handler methods declare the topic filter they listen to; the runtime
//! subscribes them, routes every inbound message to the first matching
//! subscriber, converts the payload to the declared parameter type and runs
//! the handler on a bounded worker pool.
//!
//! ## Features
//!
//! - **Declarative Subscribers**: `#[mqtt_handler]` and `#[mqtt_subscribe]` with compile-time filter checks
//! - **Typed Parameters**: `Topic`, `Bytes`, `String`, numbers, `serde_json::Value` and `Json<T>`
//! - **Shared Subscriptions**: `$share/<group>/` prefix applied from configuration
//! - **Failure Isolation**: bad payloads, handler errors and panics never stop dispatch
//! - **Ordered Shutdown**: disconnect first, then drain or drop pending work
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mqtt_dispatch::prelude::*;
//! use mqtt_dispatch::mqtt_handler;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Reading {
//!     celsius: f64,
//! }
//!
//! struct Thermostat;
//!
//! #[mqtt_handler]
//! impl Thermostat {
//!     #[mqtt_subscribe(topic = "sensors/+/temperature", qos = 1)]
//!     fn on_reading(&self, topic: Topic, reading: Json<Reading>) {
//!         println!("{topic}: {}", reading.celsius);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = MqttRuntime::builder(MqttConfig::from_env()?)
//!         .handler(Arc::new(Thermostat))
//!         .build()?;
//!     runtime.start().await?;
//!
//!     runtime
//!         .publisher()
//!         .publish(
//!             "sensors/kitchen/temperature",
//!             QoS::AtLeastOnce,
//!             &serde_json::json!({ "celsius": 21.5 }),
//!             None,
//!         )
//!         .await?;
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Topic Filters
//!
//! - `+` matches exactly one level (`sensors/+/temperature`)
//! - `#` matches the remaining levels, including none (`sensors/#` matches `sensors`)
//! - topics starting with `$` are never matched by a leading wildcard
//!
//! When several filters match a topic, the first registered subscriber wins.
//! Handlers register in the order they are added to the builder, methods in
//! name order.
//!
//! ## Configuration
//!
//! [`MqttConfig`] deserializes with serde or reads `MQTT_*` environment
//! variables through [`MqttConfig::from_env`].

// Generated code refers to `::mqtt_dispatch`, also inside this crate's tests.
extern crate self as mqtt_dispatch;

pub use mqtt_dispatch_core::*;
pub use mqtt_dispatch_macros::{mqtt_handler, mqtt_subscribe};

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_dispatch::prelude::*;
/// ```
pub mod prelude {
	pub use mqtt_dispatch_core::prelude::*;
	pub use mqtt_dispatch_macros::{mqtt_handler, mqtt_subscribe};
}
