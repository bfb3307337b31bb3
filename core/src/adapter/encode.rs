//! Outbound payload encoding

use bytes::Bytes;
use serde::Serialize;

use super::{AdapterError, Json, MessageAdapter};

/// Values that can be published as an MQTT payload.
///
/// Raw bytes pass through, text is sent as UTF-8, and everything else goes
/// through the adapter's structured encoder.
pub trait ToPayload {
	/// Encodes the value into payload bytes
	fn to_payload(&self, adapter: &MessageAdapter) -> Result<Bytes, AdapterError>;
}

impl ToPayload for Bytes {
	fn to_payload(&self, _adapter: &MessageAdapter) -> Result<Bytes, AdapterError> {
		Ok(self.clone())
	}
}

impl ToPayload for [u8] {
	fn to_payload(&self, _adapter: &MessageAdapter) -> Result<Bytes, AdapterError> {
		Ok(Bytes::copy_from_slice(self))
	}
}

impl ToPayload for Vec<u8> {
	fn to_payload(&self, _adapter: &MessageAdapter) -> Result<Bytes, AdapterError> {
		Ok(Bytes::copy_from_slice(self))
	}
}

impl ToPayload for str {
	fn to_payload(&self, _adapter: &MessageAdapter) -> Result<Bytes, AdapterError> {
		Ok(Bytes::copy_from_slice(self.as_bytes()))
	}
}

impl ToPayload for String {
	fn to_payload(&self, _adapter: &MessageAdapter) -> Result<Bytes, AdapterError> {
		Ok(Bytes::copy_from_slice(self.as_bytes()))
	}
}

impl ToPayload for serde_json::Value {
	fn to_payload(&self, adapter: &MessageAdapter) -> Result<Bytes, AdapterError> {
		adapter.encode_structured(self)
	}
}

impl<T: Serialize> ToPayload for Json<T> {
	fn to_payload(&self, adapter: &MessageAdapter) -> Result<Bytes, AdapterError> {
		adapter.encode_structured(&self.0)
	}
}

impl<T: ToPayload + ?Sized> ToPayload for &T {
	fn to_payload(&self, adapter: &MessageAdapter) -> Result<Bytes, AdapterError> {
		(**self).to_payload(adapter)
	}
}

macro_rules! structured_scalar {
	($($ty:ty),* $(,)?) => {
		$(
			impl ToPayload for $ty {
				fn to_payload(
					&self,
					adapter: &MessageAdapter,
				) -> Result<Bytes, AdapterError> {
					adapter.encode_structured(self)
				}
			}
		)*
	};
}

structured_scalar!(
	i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
	bool,
);
