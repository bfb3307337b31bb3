//! Assembly of registry, dispatch engine, pool, connector and publisher

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::adapter::MessageAdapter;
use crate::client::{
	build_wire_client, BrokerConnectError, ClientCustomizer, MqttClientError, MqttConfig,
	MqttPublisher, MqttWireClient,
};
use crate::connector::{Connector, ConnectorSettings, Health, SessionState};
use crate::dispatch::{DispatchEngine, LoggingErrorHandler, MessageErrorHandler};
use crate::executor::ExecutionPool;
use crate::registry::{MqttHandler, SubscriberRegistry};

/// Collects handlers and collaborators for an [`MqttRuntime`].
pub struct MqttRuntimeBuilder {
	config: MqttConfig,
	handlers: Vec<Arc<dyn MqttHandler>>,
	error_handler: Option<Arc<dyn MessageErrorHandler>>,
	customizers: Vec<Arc<dyn ClientCustomizer>>,
	wire_client: Option<Arc<dyn MqttWireClient>>,
	adapter: Option<Arc<MessageAdapter>>,
}

impl MqttRuntimeBuilder {
	/// Adds a handler whose subscriber methods get registered.
	pub fn handler<H: MqttHandler>(mut self, handler: Arc<H>) -> Self {
		self.handlers.push(handler);
		self
	}

	/// Replaces the default [`LoggingErrorHandler`].
	pub fn error_handler(mut self, handler: impl MessageErrorHandler) -> Self {
		self.error_handler = Some(Arc::new(handler));
		self
	}

	/// Adds a hook that adjusts the `rumqttc` options.
	pub fn customizer(mut self, customizer: impl ClientCustomizer) -> Self {
		self.customizers.push(Arc::new(customizer));
		self
	}

	/// Uses the given wire client instead of building one from the config.
	pub fn wire_client(mut self, client: Arc<dyn MqttWireClient>) -> Self {
		self.wire_client = Some(client);
		self
	}

	/// Shares a message adapter with other components.
	pub fn adapter(mut self, adapter: Arc<MessageAdapter>) -> Self {
		self.adapter = Some(adapter);
		self
	}

	/// Validates the config, registers all handlers and wires the runtime.
	///
	/// Must be called inside a tokio runtime. Nothing connects until
	/// [`MqttRuntime::start`].
	pub fn build(self) -> Result<MqttRuntime, MqttClientError> {
		let handle = Handle::try_current().map_err(|_| {
			MqttClientError::ConfigurationValue(
				"mqtt runtime must be built inside a tokio runtime".to_string(),
			)
		})?;
		self.config.validate()?;

		let mut registry = SubscriberRegistry::new(self.config.shared_group.clone());
		for handler in self.handlers {
			let name = handler.handler_name();
			let registered = registry.register(handler)?;
			debug!(handler = name, subscribers = registered, "Registered mqtt handler");
		}
		if registry.is_empty() {
			warn!("No mqtt subscribers registered, only publishing is available");
		}
		let registry = Arc::new(registry);

		let adapter = self.adapter.unwrap_or_default();
		let error_handler = self
			.error_handler
			.unwrap_or_else(|| Arc::new(LoggingErrorHandler));
		let engine = Arc::new(DispatchEngine::new(
			Arc::clone(&registry),
			Arc::clone(&adapter),
			error_handler,
		));
		let pool = Arc::new(ExecutionPool::with_handle(
			handle.clone(),
			self.config.executor_settings(),
		));
		let client = match self.wire_client {
			| Some(client) => client,
			| None => build_wire_client(&self.config, &self.customizers)?,
		};
		let connector = Connector::new(
			Arc::clone(&client),
			Arc::clone(&engine),
			Arc::clone(&pool),
			ConnectorSettings::from_config(&self.config),
			handle,
		);
		let publisher = MqttPublisher::new(client, adapter);

		info!(
			address = %self.config.address(),
			version = %self.config.protocol_version,
			subscribers = registry.len(),
			workers = pool.settings().workers,
			"Mqtt runtime assembled"
		);
		Ok(MqttRuntime {
			config: self.config,
			registry,
			engine,
			pool,
			connector,
			publisher,
		})
	}
}

/// A configured MQTT session with its dispatch machinery.
pub struct MqttRuntime {
	config: MqttConfig,
	registry: Arc<SubscriberRegistry>,
	engine: Arc<DispatchEngine>,
	pool: Arc<ExecutionPool>,
	connector: Connector,
	publisher: MqttPublisher,
}

impl MqttRuntime {
	/// Starts assembling a runtime for `config`.
	pub fn builder(config: MqttConfig) -> MqttRuntimeBuilder {
		MqttRuntimeBuilder {
			config,
			handlers: Vec::new(),
			error_handler: None,
			customizers: Vec::new(),
			wire_client: None,
			adapter: None,
		}
	}

	/// Connects and subscribes every registered subscriber.
	pub async fn start(&self) -> Result<(), BrokerConnectError> {
		self.connector.start().await
	}

	/// Stops the session, then shuts the execution pool down.
	///
	/// The pool follows the configured [`ShutdownPolicy`](crate::executor::ShutdownPolicy).
	pub async fn shutdown(&self) -> Result<(), BrokerConnectError> {
		if self.connector.session_state() == SessionState::Connected {
			self.connector.shutdown().await?;
		}
		self.pool.shutdown().await;
		info!("Mqtt runtime shut down");
		Ok(())
	}

	/// Publisher bound to this session
	pub fn publisher(&self) -> &MqttPublisher {
		&self.publisher
	}

	/// See [`Connector::is_running`]
	pub fn is_running(&self) -> bool {
		self.connector.is_running()
	}

	/// See [`Connector::health`]
	pub fn health(&self) -> Health {
		self.connector.health()
	}

	/// Registered subscribers
	pub fn registry(&self) -> &Arc<SubscriberRegistry> {
		&self.registry
	}

	/// Dispatch engine
	pub fn engine(&self) -> &Arc<DispatchEngine> {
		&self.engine
	}

	/// Execution pool
	pub fn pool(&self) -> &Arc<ExecutionPool> {
		&self.pool
	}

	/// Session connector
	pub fn connector(&self) -> &Connector {
		&self.connector
	}

	/// Config the runtime was built from
	pub fn config(&self) -> &MqttConfig {
		&self.config
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;
	use std::time::Duration;

	use rumqttc::QoS;

	use super::*;
	use crate::client::LoopbackClient;
	use crate::connector::HealthStatus;
	use crate::dispatch::MessageError;
	use crate::registry::{Invoker, ParamSpec, SubscriberMethod, Subscription};

	#[derive(Default)]
	struct Greeter {
		greetings: Mutex<Vec<String>>,
	}

	impl MqttHandler for Greeter {
		fn subscriber_methods(self: Arc<Self>) -> Vec<SubscriberMethod> {
			vec![SubscriberMethod::new(
				"on_greeting",
				Subscription::new("greet/#", QoS::AtLeastOnce),
				vec![ParamSpec::of::<String>()],
				Invoker::blocking(move |message, adapter| {
					let text: String = adapter.decode(message)?;
					if text.is_empty() {
						return Err(crate::dispatch::DispatchError::handler(
							std::io::Error::other("empty greeting"),
						));
					}
					self.greetings.lock().unwrap().push(text);
					Ok(())
				}),
			)]
		}
	}

	fn config() -> MqttConfig {
		let mut config = MqttConfig::localhost();
		config.worker_threads = Some(1);
		config
	}

	#[test]
	fn test_build_requires_tokio_runtime() {
		let result = MqttRuntime::builder(config()).build();
		assert!(matches!(result, Err(MqttClientError::ConfigurationValue(_))));
	}

	#[tokio::test]
	async fn test_invalid_config_fails_build() {
		let mut config = config();
		config.host.clear();
		let result = MqttRuntime::builder(config)
			.wire_client(Arc::new(LoopbackClient::default()))
			.build();
		assert!(matches!(result, Err(MqttClientError::ConfigurationValue(_))));
	}

	#[tokio::test]
	async fn test_publish_reaches_handler_and_errors_reach_error_handler() {
		let greeter = Arc::new(Greeter::default());
		let failures = Arc::new(Mutex::new(Vec::new()));
		let recorded = Arc::clone(&failures);
		let runtime = MqttRuntime::builder(config())
			.handler(Arc::clone(&greeter))
			.error_handler(move |error: MessageError| {
				recorded.lock().unwrap().push(error.topic().to_string());
			})
			.wire_client(Arc::new(LoopbackClient::default()))
			.build()
			.unwrap();
		assert_eq!(runtime.registry().len(), 1);
		assert_eq!(runtime.health().status, HealthStatus::Down);

		runtime.start().await.unwrap();
		assert!(runtime.is_running());
		assert_eq!(runtime.health().status, HealthStatus::Up);

		let publisher = runtime.publisher();
		publisher
			.publish("greet/en", QoS::AtLeastOnce, "hello", None)
			.await
			.unwrap();
		publisher
			.publish("greet/fr", QoS::AtLeastOnce, "", None)
			.await
			.unwrap();

		runtime.shutdown().await.unwrap();
		assert!(!runtime.is_running());
		assert!(!runtime.pool().is_running());
		assert_eq!(*greeter.greetings.lock().unwrap(), vec!["hello".to_string()]);
		assert_eq!(*failures.lock().unwrap(), vec!["greet/fr".to_string()]);
	}

	#[tokio::test]
	async fn test_shutdown_without_start_only_stops_pool() {
		let runtime = MqttRuntime::builder(config())
			.wire_client(Arc::new(LoopbackClient::default()))
			.build()
			.unwrap();
		assert!(runtime.registry().is_empty());

		tokio::time::timeout(Duration::from_secs(1), runtime.shutdown())
			.await
			.unwrap()
			.unwrap();
		assert_eq!(runtime.connector().session_state(), SessionState::Disconnected);
		assert!(!runtime.pool().is_running());
	}
}
