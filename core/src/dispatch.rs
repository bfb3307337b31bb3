//! Message dispatch and failure reporting

pub mod engine;
pub mod error;
pub mod error_handler;

#[cfg(test)]
mod dispatch_tests;

pub use engine::DispatchEngine;
pub use error::{DispatchError, MessageError, MessageErrorKind};
pub use error_handler::{LoggingErrorHandler, MessageErrorHandler};
