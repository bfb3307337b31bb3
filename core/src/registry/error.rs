//! Subscriber registration errors

use std::fmt;

use thiserror::Error;

/// One subscriber method rejected during registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSubscriber {
	/// `Handler::method` identifier
	pub method: String,
	/// Why the method was rejected
	pub reason: String,
}

impl fmt::Display for InvalidSubscriber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.method, self.reason)
	}
}

/// Registration failed; nothing from the handler was registered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Following subscribers are invalid [{}]", join(.invalid))]
pub struct ConfigurationError {
	/// Handler the invalid methods belong to
	pub handler: String,
	/// Every invalid method of the handler, in method-name order
	pub invalid: Vec<InvalidSubscriber>,
}

impl ConfigurationError {
	/// Identifiers of all rejected methods
	pub fn methods(&self) -> impl Iterator<Item = &str> {
		self.invalid.iter().map(|i| i.method.as_str())
	}
}

fn join(invalid: &[InvalidSubscriber]) -> String {
	invalid
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join(", ")
}
