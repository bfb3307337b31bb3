//! Configuration for the MQTT session, client and execution pool

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use super::error::MqttClientError;
use super::wire::{ConnectOptions, Credentials};
use crate::executor::{ExecutorSettings, ShutdownPolicy, default_workers};

/// MQTT protocol version spoken on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "u8")]
pub enum ProtocolVersion {
	/// MQTT 3.1.1
	#[default]
	V3,
	/// MQTT 5
	V5,
}

impl TryFrom<u8> for ProtocolVersion {
	type Error = String;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			| 3 => Ok(ProtocolVersion::V3),
			| 5 => Ok(ProtocolVersion::V5),
			| other => Err(format!(
				"Unsupported mqtt version {other}, expected 3 or 5"
			)),
		}
	}
}

impl fmt::Display for ProtocolVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			| ProtocolVersion::V3 => f.write_str("3"),
			| ProtocolVersion::V5 => f.write_str("5"),
		}
	}
}

/// Session, client and executor configuration.
///
/// Deserializable with the field names below; the short property names
/// (`clean`, `group`, `version`, `connect_timeout`, `shutdown`,
/// `session_expiry`) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
	/// Broker host
	pub host: String,
	/// Broker port (1..=65535)
	pub port: u16,
	/// Client identifier; a random one is generated when absent
	pub client_id: Option<String>,
	/// Username, used only together with a password
	pub username: Option<String>,
	/// Password, used only together with a username
	pub password: Option<String>,
	/// Connect over TLS
	pub ssl: bool,
	/// Clean session (MQTT 3) / clean start (MQTT 5)
	#[serde(alias = "clean")]
	pub clean_session: bool,
	/// Group for shared subscriptions
	#[serde(alias = "group")]
	pub shared_group: Option<String>,
	/// Protocol version, 3 or 5
	#[serde(alias = "version")]
	pub protocol_version: ProtocolVersion,
	/// Upper bound for connect plus initial subscriptions
	#[serde(alias = "connect_timeout")]
	pub connect_timeout_millis: u64,
	/// Execution pool shutdown behaviour
	#[serde(alias = "shutdown")]
	pub shutdown_policy: ShutdownPolicy,
	/// MQTT 5 session expiry interval
	#[serde(alias = "session_expiry")]
	pub session_expiry_seconds: u32,
	/// Keep-alive interval
	pub keep_alive_secs: u64,
	/// Capacity of the client request channel
	pub event_loop_capacity: usize,
	/// Execution pool size; defaults to the number of available cores
	pub worker_threads: Option<usize>,
	/// Bound for a graceful executor drain
	pub drain_timeout_millis: Option<u64>,
}

impl Default for MqttConfig {
	fn default() -> Self {
		Self {
			host: "localhost".to_string(),
			port: 1883,
			client_id: None,
			username: None,
			password: None,
			ssl: false,
			clean_session: true,
			shared_group: None,
			protocol_version: ProtocolVersion::V3,
			connect_timeout_millis: 10_000,
			shutdown_policy: ShutdownPolicy::Graceful,
			session_expiry_seconds: 0,
			keep_alive_secs: 60,
			event_loop_capacity: 10,
			worker_threads: None,
			drain_timeout_millis: None,
		}
	}
}

impl MqttConfig {
	/// Config for a broker with all other settings at their defaults
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			port,
			..Self::default()
		}
	}

	/// Config for localhost:1883
	pub fn localhost() -> Self {
		Self::default()
	}

	/// Reads `MQTT_*` environment variables on top of the defaults.
	pub fn from_env() -> Result<Self, MqttClientError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a config from a key lookup using the `MQTT_*` variable names.
	pub fn from_lookup(
		lookup: impl Fn(&str) -> Option<String>,
	) -> Result<Self, MqttClientError> {
		let mut config = Self::default();
		if let Some(host) = lookup("MQTT_HOST") {
			config.host = host;
		}
		if let Some(port) = parse_var(&lookup, "MQTT_PORT")? {
			config.port = port;
		}
		config.client_id = lookup("MQTT_CLIENT_ID").or(config.client_id);
		config.username = lookup("MQTT_USERNAME").or(config.username);
		config.password = lookup("MQTT_PASSWORD").or(config.password);
		if let Some(ssl) = parse_var(&lookup, "MQTT_SSL")? {
			config.ssl = ssl;
		}
		if let Some(clean) = parse_var(&lookup, "MQTT_CLEAN_SESSION")? {
			config.clean_session = clean;
		}
		config.shared_group = lookup("MQTT_SHARED_GROUP").or(config.shared_group);
		if let Some(version) = parse_var::<u8>(&lookup, "MQTT_VERSION")? {
			config.protocol_version = ProtocolVersion::try_from(version)
				.map_err(MqttClientError::ConfigurationValue)?;
		}
		if let Some(timeout) = parse_var(&lookup, "MQTT_CONNECT_TIMEOUT_MILLIS")? {
			config.connect_timeout_millis = timeout;
		}
		if let Some(policy) = lookup("MQTT_SHUTDOWN") {
			config.shutdown_policy = match policy.to_ascii_lowercase().as_str() {
				| "graceful" => ShutdownPolicy::Graceful,
				| "immediate" => ShutdownPolicy::Immediate,
				| other => {
					return Err(MqttClientError::ConfigurationValue(format!(
						"MQTT_SHUTDOWN must be graceful or immediate, got {other}"
					)));
				}
			};
		}
		if let Some(expiry) = parse_var(&lookup, "MQTT_SESSION_EXPIRY")? {
			config.session_expiry_seconds = expiry;
		}
		if let Some(keep_alive) = parse_var(&lookup, "MQTT_KEEP_ALIVE_SECS")? {
			config.keep_alive_secs = keep_alive;
		}
		if let Some(workers) = parse_var(&lookup, "MQTT_WORKER_THREADS")? {
			config.worker_threads = Some(workers);
		}
		if let Some(drain) = parse_var(&lookup, "MQTT_DRAIN_TIMEOUT_MILLIS")? {
			config.drain_timeout_millis = Some(drain);
		}
		config.validate()?;
		Ok(config)
	}

	/// Checks value ranges that the types alone do not enforce.
	pub fn validate(&self) -> Result<(), MqttClientError> {
		if self.host.trim().is_empty() {
			return Err(MqttClientError::ConfigurationValue(
				"host must not be empty".to_string(),
			));
		}
		if self.port == 0 {
			return Err(MqttClientError::ConfigurationValue(
				"port must be in 1..=65535".to_string(),
			));
		}
		if self.client_id.as_deref().is_some_and(str::is_empty) {
			return Err(MqttClientError::ConfigurationValue(
				"client_id must not be empty when set".to_string(),
			));
		}
		if self.connect_timeout_millis == 0 {
			return Err(MqttClientError::ConfigurationValue(
				"connect_timeout_millis must be greater than 0".to_string(),
			));
		}
		if self.event_loop_capacity == 0 {
			return Err(MqttClientError::ConfigurationValue(
				"event_loop_capacity must be greater than 0".to_string(),
			));
		}
		if self.worker_threads == Some(0) {
			return Err(MqttClientError::ConfigurationValue(
				"worker_threads must be greater than 0".to_string(),
			));
		}
		if self.keep_alive_secs != 0 && self.keep_alive_secs < 5 {
			return Err(MqttClientError::ConfigurationValue(
				"keep_alive_secs must be 0 or at least 5".to_string(),
			));
		}
		Ok(())
	}

	/// `host:port`
	pub fn address(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	/// Credentials, present only when both username and password are set
	pub fn credentials(&self) -> Option<Credentials> {
		match (&self.username, &self.password) {
			| (Some(username), Some(password)) => Some(Credentials {
				username: username.clone(),
				password: password.clone(),
			}),
			| _ => None,
		}
	}

	/// Connect timeout as a duration
	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_millis)
	}

	/// Options handed to the wire client on connect
	pub fn connect_options(&self) -> ConnectOptions {
		ConnectOptions {
			clean_session: self.clean_session,
			credentials: self.credentials(),
			session_expiry_seconds: self.session_expiry_seconds,
		}
	}

	/// Execution pool settings
	pub fn executor_settings(&self) -> ExecutorSettings {
		ExecutorSettings {
			workers: self.worker_threads.unwrap_or_else(default_workers),
			policy: self.shutdown_policy,
			drain_timeout: self.drain_timeout_millis.map(Duration::from_millis),
		}
	}
}

fn parse_var<T: FromStr>(
	lookup: &impl Fn(&str) -> Option<String>,
	key: &str,
) -> Result<Option<T>, MqttClientError>
where T::Err: fmt::Display {
	lookup(key)
		.map(|raw| {
			raw.trim().parse::<T>().map_err(|e| {
				MqttClientError::ConfigurationValue(format!(
					"{key}={raw} is invalid: {e}"
				))
			})
		})
		.transpose()
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn test_defaults() {
		let config = MqttConfig::default();
		assert_eq!(config.address(), "localhost:1883");
		assert!(config.clean_session);
		assert_eq!(config.protocol_version, ProtocolVersion::V3);
		assert_eq!(config.connect_timeout(), Duration::from_secs(10));
		assert_eq!(config.shutdown_policy, ShutdownPolicy::Graceful);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_credentials_need_both_parts() {
		let mut config = MqttConfig::localhost();
		config.username = Some("user".into());
		assert!(config.credentials().is_none());
		config.password = Some("secret".into());
		assert_eq!(config.credentials().unwrap().username, "user");
	}

	#[test]
	fn test_from_lookup() {
		let config = MqttConfig::from_lookup(lookup(&[
			("MQTT_HOST", "broker.local"),
			("MQTT_PORT", "8883"),
			("MQTT_SSL", "true"),
			("MQTT_VERSION", "5"),
			("MQTT_SHARED_GROUP", "workers"),
			("MQTT_SHUTDOWN", "IMMEDIATE"),
			("MQTT_SESSION_EXPIRY", "4294967295"),
			("MQTT_WORKER_THREADS", "3"),
		]))
		.unwrap();

		assert_eq!(config.address(), "broker.local:8883");
		assert!(config.ssl);
		assert_eq!(config.protocol_version, ProtocolVersion::V5);
		assert_eq!(config.shared_group.as_deref(), Some("workers"));
		assert_eq!(config.shutdown_policy, ShutdownPolicy::Immediate);
		assert_eq!(config.session_expiry_seconds, u32::MAX);
		assert_eq!(config.executor_settings().workers, 3);
	}

	#[test]
	fn test_rejects_out_of_range_values() {
		for vars in [
			[("MQTT_PORT", "0")],
			[("MQTT_PORT", "65536")],
			[("MQTT_VERSION", "4")],
			[("MQTT_SESSION_EXPIRY", "4294967296")],
			[("MQTT_SESSION_EXPIRY", "-1")],
			[("MQTT_HOST", " ")],
			[("MQTT_SHUTDOWN", "later")],
		] {
			let result = MqttConfig::from_lookup(lookup(&vars));
			assert!(
				matches!(result, Err(MqttClientError::ConfigurationValue(_))),
				"{vars:?} -> {result:?}"
			);
		}
	}

	#[test]
	fn test_deserializes_with_property_aliases() {
		let config: MqttConfig = serde_json::from_str(
			r#"{
				"host": "mqtt.example",
				"port": 1884,
				"clean": false,
				"group": "g1",
				"version": 5,
				"connect_timeout": 2500,
				"shutdown": "IMMEDIATE",
				"session_expiry": 300
			}"#,
		)
		.unwrap();

		assert_eq!(config.port, 1884);
		assert!(!config.clean_session);
		assert_eq!(config.shared_group.as_deref(), Some("g1"));
		assert_eq!(config.protocol_version, ProtocolVersion::V5);
		assert_eq!(config.connect_timeout_millis, 2500);
		assert_eq!(config.shutdown_policy, ShutdownPolicy::Immediate);
		assert_eq!(config.session_expiry_seconds, 300);
		assert_eq!(config.keep_alive_secs, 60);
	}

	#[test]
	fn test_rejects_unknown_version_when_deserializing() {
		let result = serde_json::from_str::<MqttConfig>(r#"{"version": 4}"#);
		assert!(result.is_err());
	}
}
