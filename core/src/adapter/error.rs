//! Payload conversion errors

use thiserror::Error;

/// Errors raised while converting between payload bytes and values
#[derive(Error, Debug)]
pub enum AdapterError {
	/// Payload is not well-formed for the structured format
	#[error("Failed to parse payload as {target}: {source}")]
	PayloadParse {
		/// Target type name
		target: &'static str,
		/// Underlying codec error
		#[source]
		source: serde_json::Error,
	},

	/// Payload is well-formed but does not fit the target type
	#[error("Failed to map payload to {target}: {source}")]
	PayloadMapping {
		/// Target type name
		target: &'static str,
		/// Underlying codec error
		#[source]
		source: serde_json::Error,
	},

	/// Payload requested as text is not valid UTF-8
	#[error("Payload is not valid UTF-8: {0}")]
	InvalidUtf8(#[from] std::str::Utf8Error),

	/// Value could not be encoded
	#[error("Failed to encode payload from {source_type}: {source}")]
	Encode {
		/// Source type name
		source_type: &'static str,
		/// Underlying codec error
		#[source]
		source: serde_json::Error,
	},
}

impl AdapterError {
	/// Classifies a structured decode failure.
	///
	/// Data errors (type mismatch, missing field) are mapping failures; syntax,
	/// truncated input and I/O errors are parse failures.
	pub fn decode(target: &'static str, source: serde_json::Error) -> Self {
		match source.classify() {
			| serde_json::error::Category::Data => {
				Self::PayloadMapping { target, source }
			}
			| _ => Self::PayloadParse { target, source },
		}
	}

	/// Returns true if the payload was well-formed but did not fit the target.
	pub fn is_mapping_failure(&self) -> bool {
		matches!(self, Self::PayloadMapping { .. })
	}

	/// Returns true if the payload could not be parsed at all.
	pub fn is_parse_failure(&self) -> bool {
		matches!(self, Self::PayloadParse { .. } | Self::InvalidUtf8(_))
	}
}
