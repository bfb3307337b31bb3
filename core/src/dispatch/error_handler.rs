//! Sinks for message handling failures

use tracing::error;

use super::error::MessageError;

/// Receives every message that failed to dispatch.
pub trait MessageErrorHandler: Send + Sync + 'static {
	/// Handles one failed message
	fn handle(&self, error: MessageError);
}

impl<F> MessageErrorHandler for F
where F: Fn(MessageError) + Send + Sync + 'static
{
	fn handle(&self, error: MessageError) {
		self(error)
	}
}

/// Default error handler: logs the failure and drops the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingErrorHandler;

impl MessageErrorHandler for LoggingErrorHandler {
	fn handle(&self, error: MessageError) {
		error!(
			topic = %error.topic(),
			payload_size = error.payload().len(),
			kind = ?error.kind(),
			cause = %error.cause(),
			"{}",
			error.message()
		);
	}
}
