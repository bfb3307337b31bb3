//! Subscriber declarations and their invocable handles

use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use arcstr::ArcStr;
use futures::future::BoxFuture;
use rumqttc::QoS;

use crate::adapter::{FromMqttMessage, MessageAdapter, ParamKind};
use crate::dispatch::DispatchError;
use crate::message::InboundMessage;
use crate::topic::{Topic, TopicFilter};

/// Boxed error returned by fallible handlers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type BlockingFn = dyn Fn(&InboundMessage, &MessageAdapter) -> Result<(), DispatchError>
	+ Send
	+ Sync;

type SuspendingFn = dyn Fn(&InboundMessage, &MessageAdapter) -> BoxFuture<'static, Result<(), DispatchError>>
	+ Send
	+ Sync;

/// Subscription declaration attached to a handler method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
	topic: ArcStr,
	qos: QoS,
	shared: bool,
}

impl Subscription {
	/// Declares a non-shared subscription.
	pub fn new(topic: impl Into<ArcStr>, qos: QoS) -> Self {
		Self {
			topic: topic.into(),
			qos,
			shared: false,
		}
	}

	/// Requests the shared form when a shared group is configured.
	pub fn shared(mut self, shared: bool) -> Self {
		self.shared = shared;
		self
	}

	/// Declared topic filter, before any shared prefix is applied
	pub fn topic(&self) -> &str {
		&self.topic
	}

	/// Requested subscription QoS
	pub fn qos(&self) -> QoS {
		self.qos
	}

	/// Whether the shared form was requested
	pub fn is_shared(&self) -> bool {
		self.shared
	}
}

/// Declared handler parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
	kind: ParamKind,
	type_name: &'static str,
}

impl ParamSpec {
	/// Describes a parameter of type `T`.
	pub fn of<T: FromMqttMessage>() -> Self {
		Self {
			kind: T::KIND,
			type_name: type_name::<T>(),
		}
	}

	/// What the parameter binds
	pub fn kind(&self) -> ParamKind {
		self.kind
	}

	/// Rust type name of the parameter
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}
}

/// Invocable handle bound to a handler instance.
///
/// The closure decodes its own arguments with the adapter and calls the
/// handler method.
#[derive(Clone)]
pub enum Invoker {
	/// Runs to completion on the calling thread
	Blocking(Arc<BlockingFn>),
	/// Returns a future that is driven to completion on the calling thread
	Suspending(Arc<SuspendingFn>),
}

impl Invoker {
	/// Wraps a synchronous handler closure.
	pub fn blocking<F>(f: F) -> Self
	where F: Fn(&InboundMessage, &MessageAdapter) -> Result<(), DispatchError>
			+ Send
			+ Sync
			+ 'static {
		Self::Blocking(Arc::new(f))
	}

	/// Wraps an asynchronous handler closure.
	pub fn suspending<F>(f: F) -> Self
	where F: Fn(
				&InboundMessage,
				&MessageAdapter,
			) -> BoxFuture<'static, Result<(), DispatchError>>
			+ Send
			+ Sync
			+ 'static {
		Self::Suspending(Arc::new(f))
	}

	/// Returns true for asynchronous handlers.
	pub fn is_suspending(&self) -> bool {
		matches!(self, Self::Suspending(_))
	}

	/// Runs the handler for one message, converting panics into errors.
	///
	/// Must not be called from an async context: suspending handlers are
	/// blocked on.
	pub fn invoke(
		&self,
		message: &InboundMessage,
		adapter: &MessageAdapter,
	) -> Result<(), DispatchError> {
		match self {
			| Invoker::Blocking(f) => contain_panic(|| f(message, adapter)),
			| Invoker::Suspending(f) => {
				let future = contain_panic(|| Ok(f(message, adapter)))?;
				contain_panic(|| block_on(future))
			}
		}
	}
}

impl fmt::Debug for Invoker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			| Invoker::Blocking(_) => f.write_str("Invoker::Blocking"),
			| Invoker::Suspending(_) => f.write_str("Invoker::Suspending"),
		}
	}
}

fn contain_panic<R>(
	f: impl FnOnce() -> Result<R, DispatchError>,
) -> Result<R, DispatchError> {
	catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
		Err(DispatchError::from_panic(panic.as_ref()))
	})
}

fn block_on<F: Future>(future: F) -> F::Output {
	match tokio::runtime::Handle::try_current() {
		| Ok(handle) => handle.block_on(future),
		| Err(_) => futures::executor::block_on(future),
	}
}

/// One subscriber method declared by a handler
#[derive(Debug, Clone)]
pub struct SubscriberMethod {
	name: String,
	subscription: Subscription,
	params: Vec<ParamSpec>,
	invoker: Invoker,
}

impl SubscriberMethod {
	/// Describes a subscriber method.
	pub fn new(
		name: impl Into<String>,
		subscription: Subscription,
		params: Vec<ParamSpec>,
		invoker: Invoker,
	) -> Self {
		Self {
			name: name.into(),
			subscription,
			params,
			invoker,
		}
	}

	/// Method name
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Subscription declaration
	pub fn subscription(&self) -> &Subscription {
		&self.subscription
	}

	/// Declared parameters, in call order
	pub fn params(&self) -> &[ParamSpec] {
		&self.params
	}

	/// At most one topic parameter and at most one payload or raw-message
	/// parameter.
	pub fn signature_problem(&self) -> Option<&'static str> {
		let topics = self
			.params
			.iter()
			.filter(|p| p.kind() == ParamKind::Topic)
			.count();
		let others = self.params.len() - topics;
		if topics > 1 {
			Some("more than one topic parameter")
		} else if others > 1 {
			Some("more than one payload parameter")
		} else {
			None
		}
	}

	pub(crate) fn into_parts(
		self,
	) -> (String, Subscription, Vec<ParamSpec>, Invoker) {
		(self.name, self.subscription, self.params, self.invoker)
	}
}

/// Subscriber with its final filter, ready for dispatch
#[derive(Debug)]
pub struct ResolvedSubscriber {
	handler: &'static str,
	method: String,
	filter: TopicFilter,
	qos: QoS,
	params: Vec<ParamSpec>,
	invoker: Invoker,
}

impl ResolvedSubscriber {
	pub(crate) fn new(
		handler: &'static str,
		method: String,
		filter: TopicFilter,
		qos: QoS,
		params: Vec<ParamSpec>,
		invoker: Invoker,
	) -> Self {
		Self {
			handler,
			method,
			filter,
			qos,
			params,
			invoker,
		}
	}

	/// `Handler::method` identifier
	pub fn id(&self) -> String {
		format!("{}::{}", self.handler, self.method)
	}

	/// Owning handler name
	pub fn handler(&self) -> &'static str {
		self.handler
	}

	/// Method name
	pub fn method(&self) -> &str {
		&self.method
	}

	/// Filter sent to the broker, shared prefix included
	pub fn filter(&self) -> &TopicFilter {
		&self.filter
	}

	/// Subscription QoS
	pub fn qos(&self) -> QoS {
		self.qos
	}

	/// Declared parameters
	pub fn params(&self) -> &[ParamSpec] {
		&self.params
	}

	/// Tests the concrete topic against the filter part.
	pub fn matches(&self, topic: &Topic) -> bool {
		self.filter.matches(topic)
	}

	/// Decodes arguments and calls the handler method.
	pub fn invoke(
		&self,
		message: &InboundMessage,
		adapter: &MessageAdapter,
	) -> Result<(), DispatchError> {
		self.invoker.invoke(message, adapter)
	}
}

/// Return types accepted from handler methods
pub trait IntoHandlerResult {
	/// Normalizes the return value
	fn into_handler_result(self) -> Result<(), BoxError>;
}

impl IntoHandlerResult for () {
	fn into_handler_result(self) -> Result<(), BoxError> {
		Ok(())
	}
}

impl<E: Into<BoxError>> IntoHandlerResult for Result<(), E> {
	fn into_handler_result(self) -> Result<(), BoxError> {
		self.map_err(Into::into)
	}
}

/// An object exposing subscriber methods.
///
/// Usually implemented by `#[mqtt_handler]` on an `impl` block.
pub trait MqttHandler: Send + Sync + 'static {
	/// Lists every declared subscriber method, bound to this instance.
	fn subscriber_methods(self: Arc<Self>) -> Vec<SubscriberMethod>;

	/// Short name used in logs and registration errors.
	fn handler_name(&self) -> &'static str {
		let full = type_name::<Self>();
		let base = full.split('<').next().unwrap_or(full);
		base.rsplit("::").next().unwrap_or(base)
	}
}
