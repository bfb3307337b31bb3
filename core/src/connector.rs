//! Session lifecycle: connect, subscribe, stop
//!
//! The connector owns the [`SessionState`] machine. It is the only writer
//! of that state; everything else observes it through [`Connector::watch_state`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::client::{
	BrokerConnectError, ConnectOptions, ConnectionState, MessageCallback, MqttConfig,
	MqttWireClient,
};
use crate::dispatch::DispatchEngine;
use crate::executor::ExecutionPool;
use crate::message::InboundMessage;
use crate::registry::SubscriberRegistry;

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
	/// Not connected; `start` is allowed
	#[default]
	Disconnected,
	/// `start` in progress
	Connecting,
	/// Connected and subscribed; `stop` is allowed
	Connected,
	/// `stop` or an aborted `start` in progress
	Disconnecting,
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			| SessionState::Disconnected => "DISCONNECTED",
			| SessionState::Connecting => "CONNECTING",
			| SessionState::Connected => "CONNECTED",
			| SessionState::Disconnecting => "DISCONNECTING",
		};
		f.write_str(name)
	}
}

/// Health status reported by [`Connector::health`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
	/// Connected to the broker
	Up,
	/// Anything else
	Down,
}

/// Snapshot of the session for health reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
	/// Up only while the wire client is connected
	pub status: HealthStatus,
	/// Session state at the time of the check
	pub state: SessionState,
}

/// Connection parameters derived from [`MqttConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorSettings {
	/// `host:port`, for diagnostics
	pub address: String,
	/// Upper bound for connect plus initial subscriptions
	pub connect_timeout: Duration,
	/// Options handed to the wire client
	pub connect_options: ConnectOptions,
}

impl ConnectorSettings {
	/// Extracts the connector settings from a config.
	pub fn from_config(config: &MqttConfig) -> Self {
		Self {
			address: config.address(),
			connect_timeout: config.connect_timeout(),
			connect_options: config.connect_options(),
		}
	}
}

/// Drives the wire client through the session lifecycle.
pub struct Connector {
	client: Arc<dyn MqttWireClient>,
	registry: Arc<SubscriberRegistry>,
	callback: MessageCallback,
	settings: ConnectorSettings,
	state: Arc<watch::Sender<SessionState>>,
	handle: Handle,
}

impl Connector {
	/// Creates a disconnected connector.
	///
	/// `handle` is the runtime that runs the asynchronous part of `stop`.
	pub fn new(
		client: Arc<dyn MqttWireClient>,
		engine: Arc<DispatchEngine>,
		pool: Arc<ExecutionPool>,
		settings: ConnectorSettings,
		handle: Handle,
	) -> Self {
		let (state, session) = watch::channel(SessionState::Disconnected);
		Self {
			client,
			registry: Arc::clone(engine.registry()),
			callback: dispatch_callback(engine, pool, session),
			settings,
			state: Arc::new(state),
			handle,
		}
	}

	/// Connects and subscribes every registered filter.
	///
	/// Subscriptions are issued concurrently with the connect, and the whole
	/// operation is bounded by the connect timeout. On failure the session is
	/// torn down again and ends `Disconnected`.
	pub async fn start(&self) -> Result<(), BrokerConnectError> {
		self.transition(SessionState::Disconnected, SessionState::Connecting, "start")?;
		info!(
			address = %self.settings.address,
			subscribers = self.registry.len(),
			"Connecting to broker"
		);

		let subscriptions = self.registry.subscribers().iter().map(|subscriber| {
			let client = Arc::clone(&self.client);
			let callback = Arc::clone(&self.callback);
			let subscriber = Arc::clone(subscriber);
			async move {
				debug!(
					filter = %subscriber.filter(),
					qos = ?subscriber.qos(),
					subscriber = %subscriber.id(),
					"Subscribing"
				);
				client
					.subscribe(subscriber.filter(), subscriber.qos(), callback)
					.await
					.map_err(|source| BrokerConnectError::Subscribe {
						filter: subscriber.filter().to_string(),
						source,
					})
			}
		});
		let connect = async {
			self.client
				.connect(self.settings.connect_options.clone())
				.await
				.map_err(|source| BrokerConnectError::Connect {
					address: self.settings.address.clone(),
					source,
				})
		};

		let outcome = tokio::time::timeout(
			self.settings.connect_timeout,
			future::try_join(connect, future::try_join_all(subscriptions)),
		)
		.await
		.unwrap_or_else(|_| {
			Err(BrokerConnectError::Timeout {
				timeout_millis: self.settings.connect_timeout.as_millis() as u64,
			})
		});

		match outcome {
			| Ok((ack, subscribed)) => {
				self.transition(
					SessionState::Connecting,
					SessionState::Connected,
					"finish start",
				)?;
				info!(
					session_present = ack.session_present,
					subscriptions = subscribed.len(),
					"Mqtt session started"
				);
				Ok(())
			}
			| Err(err) => {
				error!(error = %err, "Failed to start mqtt session");
				self.abort().await;
				Err(err)
			}
		}
	}

	/// Disconnects on a background task and then runs `callback`.
	///
	/// Returns at once; fails unless the session is connected.
	pub fn stop<F>(&self, callback: F) -> Result<(), BrokerConnectError>
	where F: FnOnce() + Send + 'static {
		self.transition(SessionState::Connected, SessionState::Disconnecting, "stop")?;
		info!(address = %self.settings.address, "Disconnecting from broker");
		let client = Arc::clone(&self.client);
		let state = Arc::clone(&self.state);
		self.handle.spawn(async move {
			if let Err(err) = client.disconnect().await {
				warn!(error = %err, "Failed to disconnect cleanly");
			}
			state.send_replace(SessionState::Disconnected);
			info!("Mqtt session stopped");
			callback();
		});
		Ok(())
	}

	/// Stops the session and waits until the disconnect has finished.
	pub async fn shutdown(&self) -> Result<(), BrokerConnectError> {
		let (done, finished) = oneshot::channel();
		self.stop(move || {
			let _ = done.send(());
		})?;
		if finished.await.is_err() {
			warn!("Disconnect task ended without completing");
		}
		Ok(())
	}

	/// Current session state
	pub fn session_state(&self) -> SessionState {
		*self.state.borrow()
	}

	/// Subscribes to session state changes.
	pub fn watch_state(&self) -> watch::Receiver<SessionState> {
		self.state.subscribe()
	}

	/// Returns true unless the wire client reports `Disconnected`.
	///
	/// A client that is reconnecting counts as running.
	pub fn is_running(&self) -> bool {
		self.client.connection_state() != ConnectionState::Disconnected
	}

	/// Up when the wire client is connected, Down otherwise.
	pub fn health(&self) -> Health {
		let status = if self.client.connection_state().is_connected() {
			HealthStatus::Up
		} else {
			HealthStatus::Down
		};
		Health {
			status,
			state: self.session_state(),
		}
	}

	/// Connection settings in use
	pub fn settings(&self) -> &ConnectorSettings {
		&self.settings
	}

	async fn abort(&self) {
		if self
			.transition(SessionState::Connecting, SessionState::Disconnecting, "abort")
			.is_err()
		{
			return;
		}
		if let Err(err) = self.client.disconnect().await {
			debug!(error = %err, "Disconnect after failed start failed");
		}
		self.state.send_replace(SessionState::Disconnected);
	}

	fn transition(
		&self,
		from: SessionState,
		to: SessionState,
		operation: &'static str,
	) -> Result<(), BrokerConnectError> {
		let mut observed = from;
		let changed = self.state.send_if_modified(|state| {
			if *state == from {
				*state = to;
				true
			} else {
				observed = *state;
				false
			}
		});
		if changed {
			debug!(%from, %to, "Session state changed");
			Ok(())
		} else {
			Err(BrokerConnectError::InvalidState {
				operation,
				state: observed,
			})
		}
	}
}

/// The one callback every subscription of a connector routes to.
///
/// Wire clients keep their routes across sessions, so messages arriving
/// while the session is `Disconnected` are dropped here.
fn dispatch_callback(
	engine: Arc<DispatchEngine>,
	pool: Arc<ExecutionPool>,
	session: watch::Receiver<SessionState>,
) -> MessageCallback {
	Arc::new(move |message: InboundMessage| {
		let topic = message.topic().clone();
		if *session.borrow() == SessionState::Disconnected {
			debug!(topic = %topic, "Session is disconnected, dropping message");
			return;
		}
		let engine = Arc::clone(&engine);
		if pool.execute(move || engine.handle(message)).is_err() {
			warn!(topic = %topic, "Execution pool is shut down, dropping message");
		}
	})
}

impl fmt::Debug for Connector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Connector")
			.field("address", &self.settings.address)
			.field("state", &self.session_state())
			.field("subscribers", &self.registry.len())
			.finish()
	}
}
