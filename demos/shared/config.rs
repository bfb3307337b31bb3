use mqtt_dispatch::{MqttClientError, MqttConfig};

/// Load .env files, local overrides first
///
/// `dotenv` never overwrites variables that are already set, so values from
/// `demos/.env.local` win over `demos/.env`, and the real environment wins
/// over both.
pub fn load_env_files() {
	if std::path::Path::new("demos/.env.local").exists() {
		dotenv::from_filename("demos/.env.local").ok();
	}
	dotenv::from_filename("demos/.env").ok();
}

/// Broker configuration from `MQTT_*` variables
///
/// # Examples
/// - `MQTT_HOST=broker.hivemq.com MQTT_PORT=1883` - public broker
/// - `MQTT_VERSION=5` - MQTT 5 client
pub fn load() -> Result<MqttConfig, MqttClientError> {
	load_env_files();
	MqttConfig::from_env()
}

/// Print helpful error message for connection failures
pub fn print_connection_error(config: &MqttConfig, error: &dyn std::error::Error) {
	eprintln!("Failed to connect to MQTT broker at {}", config.address());
	eprintln!("Error: {error}");
	eprintln!();
	eprintln!("Set MQTT_HOST / MQTT_PORT, or start a local broker:");
	eprintln!("  docker run -it -p 1883:1883 eclipse-mosquitto:2 mosquitto -c /mosquitto-no-auth.conf");
}
