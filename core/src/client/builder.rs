//! Construction of rumqttc-backed wire clients from configuration

use std::sync::Arc;
use std::time::Duration;

use rumqttc::Transport;
use tracing::debug;

use super::config::{MqttConfig, ProtocolVersion};
use super::error::MqttClientError;
use super::rumqtt_v3::RumqttV3Client;
use super::rumqtt_v5::RumqttV5Client;
use super::wire::MqttWireClient;

/// Late-stage hook applied to the `rumqttc` options after the config.
///
/// Both methods default to doing nothing; implement the one matching the
/// configured protocol version.
pub trait ClientCustomizer: Send + Sync + 'static {
	/// Adjusts MQTT 3 options
	fn customize_v3(&self, _options: &mut rumqttc::MqttOptions) {}

	/// Adjusts MQTT 5 options
	fn customize_v5(&self, _options: &mut rumqttc::v5::MqttOptions) {}
}

fn generated_client_id() -> String {
	format!("mqtt-dispatch-{}", uuid::Uuid::new_v4().simple())
}

/// Builds the `rumqttc` client for the configured protocol version.
pub fn build_wire_client(
	config: &MqttConfig,
	customizers: &[Arc<dyn ClientCustomizer>],
) -> Result<Arc<dyn MqttWireClient>, MqttClientError> {
	config.validate()?;
	let client_id = config.client_id.clone().unwrap_or_else(generated_client_id);
	let keep_alive = Duration::from_secs(config.keep_alive_secs);
	debug!(
		client_id = %client_id,
		address = %config.address(),
		version = %config.protocol_version,
		ssl = config.ssl,
		"Building mqtt client"
	);

	match config.protocol_version {
		| ProtocolVersion::V3 => {
			let mut options =
				rumqttc::MqttOptions::new(client_id, config.host.as_str(), config.port);
			options.set_keep_alive(keep_alive);
			if config.ssl {
				options.set_transport(Transport::tls_with_default_config());
			}
			for customizer in customizers {
				customizer.customize_v3(&mut options);
			}
			Ok(Arc::new(RumqttV3Client::new(options, config.event_loop_capacity)))
		}
		| ProtocolVersion::V5 => {
			let mut options =
				rumqttc::v5::MqttOptions::new(client_id, config.host.as_str(), config.port);
			options.set_keep_alive(keep_alive);
			if config.ssl {
				options.set_transport(Transport::tls_with_default_config());
			}
			for customizer in customizers {
				customizer.customize_v5(&mut options);
			}
			Ok(Arc::new(RumqttV5Client::new(options, config.event_loop_capacity)))
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::client::wire::ConnectionState;

	#[derive(Default)]
	struct CountingCustomizer {
		v3: AtomicUsize,
		v5: AtomicUsize,
	}

	impl ClientCustomizer for CountingCustomizer {
		fn customize_v3(&self, options: &mut rumqttc::MqttOptions) {
			self.v3.fetch_add(1, Ordering::SeqCst);
			options.set_max_packet_size(1024, 1024);
		}

		fn customize_v5(&self, _options: &mut rumqttc::v5::MqttOptions) {
			self.v5.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[tokio::test]
	async fn test_builds_client_for_each_version() {
		let customizer = Arc::new(CountingCustomizer::default());
		let hooks: Vec<Arc<dyn ClientCustomizer>> = vec![customizer.clone()];

		let v3 = build_wire_client(&MqttConfig::localhost(), &hooks).unwrap();
		assert_eq!(v3.protocol_version(), ProtocolVersion::V3);
		assert_eq!(v3.connection_state(), ConnectionState::Disconnected);

		let mut config = MqttConfig::localhost();
		config.protocol_version = ProtocolVersion::V5;
		let v5 = build_wire_client(&config, &hooks).unwrap();
		assert_eq!(v5.protocol_version(), ProtocolVersion::V5);

		assert_eq!(customizer.v3.load(Ordering::SeqCst), 1);
		assert_eq!(customizer.v5.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_rejects_invalid_config() {
		let mut config = MqttConfig::localhost();
		config.port = 0;
		assert!(matches!(
			build_wire_client(&config, &[]),
			Err(MqttClientError::ConfigurationValue(_))
		));
	}

	#[test]
	fn test_generated_client_ids_are_unique() {
		assert_ne!(generated_client_id(), generated_client_id());
	}
}
