//! Dispatch failures and the contextual message error

use std::any::Any;

use bytes::Bytes;
use thiserror::Error;

use crate::adapter::AdapterError;
use crate::message::InboundMessage;
use crate::registry::BoxError;
use crate::topic::Topic;

/// Failure while decoding arguments or running a handler
#[derive(Error, Debug)]
pub enum DispatchError {
	/// Arguments could not be decoded from the message
	#[error(transparent)]
	Adapter(#[from] AdapterError),

	/// The handler returned an error
	#[error("Handler failed: {0}")]
	Handler(#[source] BoxError),

	/// The handler panicked
	#[error("Handler panicked: {0}")]
	Panicked(String),
}

impl DispatchError {
	/// Wraps an error returned by a handler.
	pub fn handler(err: impl Into<BoxError>) -> Self {
		Self::Handler(err.into())
	}

	pub(crate) fn from_panic(panic: &(dyn Any + Send)) -> Self {
		let text = panic
			.downcast_ref::<&str>()
			.map(|s| s.to_string())
			.or_else(|| panic.downcast_ref::<String>().cloned())
			.unwrap_or_else(|| "non-string panic payload".to_string());
		Self::Panicked(text)
	}
}

/// Coarse classification of a message failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageErrorKind {
	/// Payload was not well-formed
	PayloadParse,
	/// Payload was well-formed but did not fit the target type
	PayloadMapping,
	/// Handler returned an error
	Handler,
	/// Handler panicked
	Panicked,
}

/// A failed delivery, reported to the configured error handler.
///
/// Carries the topic and raw payload of the message that failed.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct MessageError {
	topic: Topic,
	payload: Bytes,
	message: String,
	#[source]
	cause: DispatchError,
}

impl MessageError {
	/// Builds the contextual error for a failed message.
	pub fn new(message: &InboundMessage, cause: DispatchError) -> Self {
		let topic = message.topic().clone();
		let text = match &cause {
			| DispatchError::Adapter(err) if err.is_mapping_failure() => format!(
				"Error while handling mqtt message on topic [{topic}]: Failed \
				 to map payload to target type"
			),
			| DispatchError::Adapter(_) => format!(
				"Error while handling mqtt message on topic [{topic}]: Failed \
				 to parse payload"
			),
			| _ => format!("Error while handling mqtt message on topic [{topic}]"),
		};
		Self {
			topic,
			payload: message.payload().clone(),
			message: text,
			cause,
		}
	}

	/// Topic of the failed message
	pub fn topic(&self) -> &Topic {
		&self.topic
	}

	/// Raw payload of the failed message
	pub fn payload(&self) -> &Bytes {
		&self.payload
	}

	/// Contextual description
	pub fn message(&self) -> &str {
		&self.message
	}

	/// Underlying failure
	pub fn cause(&self) -> &DispatchError {
		&self.cause
	}

	/// Classification of the failure
	pub fn kind(&self) -> MessageErrorKind {
		match &self.cause {
			| DispatchError::Adapter(err) if err.is_mapping_failure() => {
				MessageErrorKind::PayloadMapping
			}
			| DispatchError::Adapter(_) => MessageErrorKind::PayloadParse,
			| DispatchError::Handler(_) => MessageErrorKind::Handler,
			| DispatchError::Panicked(_) => MessageErrorKind::Panicked,
		}
	}
}
