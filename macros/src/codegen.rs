//! Code generation logic
//!
//! Emits the cleaned `impl` block followed by an `MqttHandler` impl whose
//! `subscriber_methods` binds every marked method to the handler instance.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::analysis::{HandlerAnalysisContext, SubscriberMethodInfo};

/// Generates the `MqttHandler` implementation for an analyzed impl block
pub struct CodeGenerator {
	context: HandlerAnalysisContext,
}

impl CodeGenerator {
	/// Create a new code generator with the given analysis context
	pub fn new(context: HandlerAnalysisContext) -> Self {
		Self { context }
	}

	/// Generate the cleaned impl block plus the trait implementation
	pub fn generate_complete_implementation(&self) -> TokenStream {
		let item_impl = &self.context.item_impl;
		let handler_impl = self.generate_handler_impl();
		quote! {
			#item_impl
			#handler_impl
		}
	}

	fn generate_handler_impl(&self) -> TokenStream {
		let item_impl = &self.context.item_impl;
		let self_ty = &item_impl.self_ty;
		let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();
		let handler_name = self.handler_name();
		let methods = self
			.context
			.methods
			.iter()
			.map(|method| self.generate_subscriber_method(method));

		quote! {
			impl #impl_generics ::mqtt_dispatch::registry::MqttHandler for #self_ty #where_clause {
				fn subscriber_methods(
					self: ::std::sync::Arc<Self>,
				) -> ::std::vec::Vec<::mqtt_dispatch::registry::SubscriberMethod> {
					::std::vec![#(#methods),*]
				}

				fn handler_name(&self) -> &'static str {
					#handler_name
				}
			}
		}
	}

	/// Last path segment of the self type, e.g. `Sensors` for `crate::Sensors<T>`
	fn handler_name(&self) -> String {
		match self.context.item_impl.self_ty.as_ref() {
			| syn::Type::Path(type_path) => type_path
				.path
				.segments
				.last()
				.map(|segment| segment.ident.to_string())
				.unwrap_or_default(),
			| other => quote!(#other).to_string(),
		}
	}

	fn generate_subscriber_method(&self, method: &SubscriberMethodInfo) -> TokenStream {
		let name = method.ident.to_string();
		let topic = &method.args.topic;
		let qos = format_ident!("{}", method.args.qos.variant_name());
		let shared = method.args.shared;
		let param_types = &method.param_types;
		let invoker = if method.is_async {
			Self::generate_suspending_invoker(method)
		} else {
			Self::generate_blocking_invoker(method)
		};

		quote! {
			::mqtt_dispatch::registry::SubscriberMethod::new(
				#name,
				::mqtt_dispatch::registry::Subscription::new(#topic, ::mqtt_dispatch::QoS::#qos)
				.shared(#shared),
				::std::vec![
					#(::mqtt_dispatch::registry::ParamSpec::of::<#param_types>()),*
				],
				#invoker,
			)
		}
	}

	fn argument_idents(method: &SubscriberMethodInfo) -> Vec<syn::Ident> {
		(0..method.param_types.len())
			.map(|index| format_ident!("arg{}", index))
			.collect()
	}

	/// Closure parameter names; underscored when nothing is decoded.
	fn closure_idents(method: &SubscriberMethodInfo) -> (syn::Ident, syn::Ident) {
		if method.param_types.is_empty() {
			(format_ident!("_message"), format_ident!("_adapter"))
		} else {
			(format_ident!("message"), format_ident!("adapter"))
		}
	}

	fn generate_blocking_invoker(method: &SubscriberMethodInfo) -> TokenStream {
		let ident = &method.ident;
		let param_types = &method.param_types;
		let args = Self::argument_idents(method);
		let (message, adapter) = Self::closure_idents(method);

		quote! {
			{
				let owner = ::std::sync::Arc::clone(&self);
				::mqtt_dispatch::registry::Invoker::blocking(move |#message, #adapter| {
					#(
						let #args = <#param_types as ::mqtt_dispatch::adapter::FromMqttMessage>::from_message(
							#message,
							#adapter,
						)?;
					)*
					::mqtt_dispatch::registry::IntoHandlerResult::into_handler_result(
						owner.#ident(#(#args),*),
					)
					.map_err(::mqtt_dispatch::dispatch::DispatchError::Handler)
				})
			}
		}
	}

	/// Arguments are decoded before the future is created so the future
	/// does not borrow the message.
	fn generate_suspending_invoker(method: &SubscriberMethodInfo) -> TokenStream {
		let ident = &method.ident;
		let param_types = &method.param_types;
		let args = Self::argument_idents(method);
		let (message, adapter) = Self::closure_idents(method);

		quote! {
			{
				let owner = ::std::sync::Arc::clone(&self);
				::mqtt_dispatch::registry::Invoker::suspending(move |#message, #adapter| {
					let owner = ::std::sync::Arc::clone(&owner);
					let arguments = (|| -> ::std::result::Result<
						(#(#param_types,)*),
						::mqtt_dispatch::adapter::AdapterError,
					> {
						::std::result::Result::Ok((
							#(
								<#param_types as ::mqtt_dispatch::adapter::FromMqttMessage>::from_message(
									#message,
									#adapter,
								)?,
							)*
						))
					})();
					::std::boxed::Box::pin(async move {
						let (#(#args,)*) = arguments
							.map_err(::mqtt_dispatch::dispatch::DispatchError::from)?;
						::mqtt_dispatch::registry::IntoHandlerResult::into_handler_result(
							owner.#ident(#(#args),*).await,
						)
						.map_err(::mqtt_dispatch::dispatch::DispatchError::Handler)
					})
				})
			}
		}
	}
}
