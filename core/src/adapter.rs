//! Conversion between MQTT payloads and handler values
//!
//! Parameter resolution order when decoding:
//!
//! 1. [`Topic`] receives the message topic
//! 2. [`Bytes`] / `Vec<u8>` receive the payload unchanged
//! 3. `String` receives the payload decoded as UTF-8
//! 4. [`InboundMessage`] receives the whole raw message
//! 5. anything else is decoded from JSON (`Json<T>`, scalars, `serde_json::Value`)
//!
//! Encoding mirrors this: bytes pass through, text is UTF-8, everything
//! else is JSON.

pub mod decode;
pub mod encode;
pub mod error;

#[cfg(test)]
mod adapter_tests;

use std::any::type_name;
use std::ops::{Deref, DerefMut};

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use decode::FromMqttMessage;
pub use encode::ToPayload;
pub use error::AdapterError;

use crate::message::InboundMessage;
use crate::topic::Topic;

/// Which part of a message a handler parameter binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
	/// The concrete topic
	Topic,
	/// The payload, raw or decoded
	Payload,
	/// The whole message wrapper
	RawMessage,
}

/// Marks a value as structured (JSON) payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
	/// Unwraps the inner value.
	pub fn into_inner(self) -> T {
		self.0
	}
}

impl<T> Deref for Json<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.0
	}
}

impl<T> DerefMut for Json<T> {
	fn deref_mut(&mut self) -> &mut T {
		&mut self.0
	}
}

/// Converts inbound messages into handler arguments and outbound values into
/// payload bytes.
#[derive(Debug, Clone, Default)]
pub struct MessageAdapter {
	_private: (),
}

impl MessageAdapter {
	/// Creates an adapter with the JSON structured codec.
	pub fn new() -> Self {
		Self::default()
	}

	/// Decodes a handler argument of type `T` from the message.
	pub fn decode<T: FromMqttMessage>(
		&self,
		message: &InboundMessage,
	) -> Result<T, AdapterError> {
		T::from_message(message, self)
	}

	/// Encodes an outbound value into payload bytes.
	pub fn encode<P: ToPayload + ?Sized>(
		&self,
		value: &P,
	) -> Result<Bytes, AdapterError> {
		value.to_payload(self)
	}

	/// The concrete topic of the message.
	pub fn topic(&self, message: &InboundMessage) -> Topic {
		message.topic().clone()
	}

	/// The payload bytes, unchanged.
	pub fn bytes(&self, message: &InboundMessage) -> Bytes {
		message.payload().clone()
	}

	/// The payload decoded as UTF-8 text.
	pub fn text(&self, message: &InboundMessage) -> Result<String, AdapterError> {
		Ok(std::str::from_utf8(message.payload())?.to_owned())
	}

	/// The payload decoded from JSON into `T`.
	pub fn structured<T: DeserializeOwned>(
		&self,
		message: &InboundMessage,
	) -> Result<T, AdapterError> {
		serde_json::from_slice(message.payload())
			.map_err(|e| AdapterError::decode(type_name::<T>(), e))
	}

	/// Encodes a value as JSON.
	pub fn encode_structured<T: Serialize + ?Sized>(
		&self,
		value: &T,
	) -> Result<Bytes, AdapterError> {
		serde_json::to_vec(value).map(Bytes::from).map_err(|source| {
			AdapterError::Encode {
				source_type: type_name::<T>(),
				source,
			}
		})
	}
}
