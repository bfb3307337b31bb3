//! Handler parameter decoding

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::{AdapterError, Json, MessageAdapter, ParamKind};
use crate::message::InboundMessage;
use crate::topic::Topic;

/// Types that can be produced from an inbound message as a handler parameter.
///
/// `KIND` tells the registry whether the parameter binds the topic, the
/// payload, or the whole raw message.
pub trait FromMqttMessage: Sized + Send + 'static {
	/// What part of the message this parameter binds
	const KIND: ParamKind;

	/// Extracts the parameter value from the message
	fn from_message(
		message: &InboundMessage,
		adapter: &MessageAdapter,
	) -> Result<Self, AdapterError>;
}

impl FromMqttMessage for Topic {
	const KIND: ParamKind = ParamKind::Topic;

	fn from_message(
		message: &InboundMessage,
		adapter: &MessageAdapter,
	) -> Result<Self, AdapterError> {
		Ok(adapter.topic(message))
	}
}

impl FromMqttMessage for Bytes {
	const KIND: ParamKind = ParamKind::Payload;

	fn from_message(
		message: &InboundMessage,
		adapter: &MessageAdapter,
	) -> Result<Self, AdapterError> {
		Ok(adapter.bytes(message))
	}
}

impl FromMqttMessage for Vec<u8> {
	const KIND: ParamKind = ParamKind::Payload;

	fn from_message(
		message: &InboundMessage,
		adapter: &MessageAdapter,
	) -> Result<Self, AdapterError> {
		Ok(adapter.bytes(message).to_vec())
	}
}

impl FromMqttMessage for String {
	const KIND: ParamKind = ParamKind::Payload;

	fn from_message(
		message: &InboundMessage,
		adapter: &MessageAdapter,
	) -> Result<Self, AdapterError> {
		adapter.text(message)
	}
}

impl FromMqttMessage for InboundMessage {
	const KIND: ParamKind = ParamKind::RawMessage;

	fn from_message(
		message: &InboundMessage,
		_adapter: &MessageAdapter,
	) -> Result<Self, AdapterError> {
		Ok(message.clone())
	}
}

impl FromMqttMessage for serde_json::Value {
	const KIND: ParamKind = ParamKind::Payload;

	fn from_message(
		message: &InboundMessage,
		adapter: &MessageAdapter,
	) -> Result<Self, AdapterError> {
		adapter.structured(message)
	}
}

impl<T> FromMqttMessage for Json<T>
where T: DeserializeOwned + Send + 'static
{
	const KIND: ParamKind = ParamKind::Payload;

	fn from_message(
		message: &InboundMessage,
		adapter: &MessageAdapter,
	) -> Result<Self, AdapterError> {
		adapter.structured(message).map(Json)
	}
}

macro_rules! structured_scalar {
	($($ty:ty),* $(,)?) => {
		$(
			impl FromMqttMessage for $ty {
				const KIND: ParamKind = ParamKind::Payload;

				fn from_message(
					message: &InboundMessage,
					adapter: &MessageAdapter,
				) -> Result<Self, AdapterError> {
					adapter.structured(message)
				}
			}
		)*
	};
}

structured_scalar!(
	i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
	bool,
);
