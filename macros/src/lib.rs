//! Procedural macros for `mqtt-dispatch`
//!
//! `#[mqtt_handler]` turns an inherent `impl` block into an `MqttHandler`.
//! Every method marked with `#[mqtt_subscribe(...)]` becomes a subscriber:
//!
//! ```rust,ignore
//! use mqtt_dispatch::{mqtt_handler, Json, Topic};
//!
//! struct Sensors;
//!
//! #[mqtt_handler]
//! impl Sensors {
//!     #[mqtt_subscribe(topic = "sensors/+/temperature", qos = 1)]
//!     fn on_temperature(&self, topic: Topic, celsius: f64) {
//!         println!("{topic}: {celsius}");
//!     }
//!
//!     #[mqtt_subscribe(topic = "commands/#", shared)]
//!     async fn on_command(&self, command: Json<Command>) -> Result<(), std::io::Error> {
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Topic filters are validated at compile time.

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemImpl};

mod analysis;
mod codegen;


use analysis::HandlerAnalysisContext;
use codegen::CodeGenerator;

/// Implements `MqttHandler` for an inherent `impl` block.
///
/// # Arguments of `#[mqtt_subscribe]`
///
/// - `topic = "..."`: MQTT topic filter, required
/// - `qos = 0|1|2`: requested QoS, defaults to 1
/// - `shared`: subscribe through the configured shared group
///
/// # Method requirements
///
/// - takes `&self`
/// - at most one `Topic` parameter and at most one payload parameter
/// - returns `()` or `Result<(), E>` where `E` converts into a boxed error
/// - may be `async`
#[proc_macro_attribute]
pub fn mqtt_handler(args: TokenStream, input: TokenStream) -> TokenStream {
	if !args.is_empty() {
		return syn::Error::new(
			proc_macro2::Span::call_site(),
			"mqtt_handler takes no arguments",
		)
		.to_compile_error()
		.into();
	}
	let item_impl = parse_macro_input!(input as ItemImpl);

	match HandlerAnalysisContext::analyze(item_impl) {
		| Ok(context) => CodeGenerator::new(context)
			.generate_complete_implementation()
			.into(),
		| Err(err) => err.to_compile_error().into(),
	}
}

/// Marks a subscriber method inside a `#[mqtt_handler]` impl block.
///
/// On its own the attribute does nothing but report misuse.
#[proc_macro_attribute]
pub fn mqtt_subscribe(_args: TokenStream, input: TokenStream) -> TokenStream {
	let input = proc_macro2::TokenStream::from(input);
	let error = syn::Error::new(
		proc_macro2::Span::call_site(),
		"#[mqtt_subscribe] is only valid on methods of a #[mqtt_handler] impl block",
	)
	.to_compile_error();
	quote::quote! {
		#error
		#input
	}
	.into()
}
