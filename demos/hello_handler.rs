//! # Hello Handler - MQTT Dispatch
//!
//! A small example demonstrating key features:
//! - Subscriber methods declared with `#[mqtt_handler]` / `#[mqtt_subscribe]`
//! - Parameters bound by type: topic, JSON payload, raw text
//! - Failures reported to an error handler without stopping dispatch
//! - Ordered shutdown
//!
//! Requires a broker, configured through `MQTT_*` variables or `demos/.env`.

mod shared;

use std::sync::Arc;
use std::time::Duration;

use mqtt_dispatch::prelude::*;
use serde::{Deserialize, Serialize};

/// Message payload, JSON on the wire
#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
	text: String,
}

struct Greeter;

#[mqtt_handler]
impl Greeter {
	/// Receives `greetings/<language>/<sender>`
	#[mqtt_subscribe(topic = "greetings/+/+", qos = 1)]
	fn on_greeting(&self, topic: Topic, greeting: Json<Greeting>) {
		let levels: Vec<&str> = topic.levels().collect();
		println!(
			"[{}] {} says: {}",
			levels.get(1).unwrap_or(&"?"),
			levels.get(2).unwrap_or(&"?"),
			greeting.text
		);
	}

	/// Plain text pings, handled asynchronously
	#[mqtt_subscribe(topic = "ping", qos = 0)]
	async fn on_ping(&self, text: String) {
		tokio::time::sleep(Duration::from_millis(10)).await;
		println!("ping: {text}");
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	shared::tracing::setup(None);

	let config = shared::config::load()?;
	println!("Connecting to MQTT broker: {}", config.address());

	let runtime = MqttRuntime::builder(config.clone())
		.handler(Arc::new(Greeter))
		.error_handler(|error: MessageError| {
			eprintln!("{} ({:?})", error, error.kind());
		})
		.build()?;
	runtime.start().await.inspect_err(|e| {
		shared::config::print_connection_error(&config, e);
	})?;
	println!("Connected, {} subscribers", runtime.registry().len());

	let publisher = runtime.publisher();
	publisher
		.publish(
			"greetings/rust/rustacean",
			QoS::AtLeastOnce,
			&Json(Greeting {
				text: "Hello, World!".to_string(),
			}),
			None,
		)
		.await?;
	// Not JSON: reported to the error handler, dispatch continues
	publisher
		.publish("greetings/rust/typo", QoS::AtLeastOnce, "hello?", None)
		.await?;
	publisher.publish("ping", QoS::AtMostOnce, "pong", None).await?;

	// Publisher and subscriber share the process; give the broker a moment.
	tokio::time::sleep(Duration::from_millis(500)).await;

	runtime.shutdown().await?;
	println!("Shut down cleanly");
	Ok(())
}
