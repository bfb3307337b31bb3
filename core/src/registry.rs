//! Subscriber discovery, validation and storage

pub mod error;
pub mod subscriber;
pub mod subscriber_registry;


pub use error::{ConfigurationError, InvalidSubscriber};
pub use subscriber::{
	BoxError, IntoHandlerResult, Invoker, MqttHandler, ParamSpec,
	ResolvedSubscriber, SubscriberMethod, Subscription,
};
pub use subscriber_registry::SubscriberRegistry;
