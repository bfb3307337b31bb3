//! Impl block analysis and validation logic
//!
//! Finds the `#[mqtt_subscribe]` methods of an `impl` block, parses their
//! arguments and checks everything that can be checked before the generated
//! code is type checked: receivers, parameter shapes and topic filter syntax.

use mqtt_dispatch_core::topic::TopicFilter;
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{FnArg, ImplItem, ImplItemFn, ItemImpl, LitBool, LitInt, LitStr, Type};

/// Name of the method-level marker attribute
pub const SUBSCRIBE_ATTRIBUTE: &str = "mqtt_subscribe";

/// Quality of service requested by a subscriber method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosLevel {
	/// QoS 0
	AtMostOnce,
	/// QoS 1
	AtLeastOnce,
	/// QoS 2
	ExactlyOnce,
}

impl QosLevel {
	/// Variant name of `rumqttc::QoS`
	pub fn variant_name(self) -> &'static str {
		match self {
			| QosLevel::AtMostOnce => "AtMostOnce",
			| QosLevel::AtLeastOnce => "AtLeastOnce",
			| QosLevel::ExactlyOnce => "ExactlyOnce",
		}
	}

	fn from_level(level: u8) -> Option<Self> {
		match level {
			| 0 => Some(QosLevel::AtMostOnce),
			| 1 => Some(QosLevel::AtLeastOnce),
			| 2 => Some(QosLevel::ExactlyOnce),
			| _ => None,
		}
	}

	fn from_name(name: &str) -> Option<Self> {
		match name {
			| "AtMostOnce" => Some(QosLevel::AtMostOnce),
			| "AtLeastOnce" => Some(QosLevel::AtLeastOnce),
			| "ExactlyOnce" => Some(QosLevel::ExactlyOnce),
			| _ => None,
		}
	}
}

/// Parsed `#[mqtt_subscribe(...)]` arguments
#[derive(Debug, Clone)]
pub struct SubscribeArgs {
	/// Topic filter literal, already validated
	pub topic: LitStr,
	/// Requested QoS, `AtLeastOnce` when omitted
	pub qos: QosLevel,
	/// Whether the configured shared group applies
	pub shared: bool,
}

impl SubscribeArgs {
	/// Parses and validates the attribute arguments.
	///
	/// Accepted forms: `topic = "..."` (required), `qos = 0|1|2` or
	/// `qos = AtLeastOnce`, and `shared` or `shared = true|false`.
	pub fn parse(attr: &syn::Attribute) -> Result<Self, syn::Error> {
		let mut topic: Option<LitStr> = None;
		let mut qos: Option<QosLevel> = None;
		let mut shared = false;

		attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("topic") {
				if topic.is_some() {
					return Err(meta.error("duplicate `topic` argument"));
				}
				topic = Some(meta.value()?.parse()?);
				Ok(())
			} else if meta.path.is_ident("qos") {
				if qos.is_some() {
					return Err(meta.error("duplicate `qos` argument"));
				}
				qos = Some(parse_qos(&meta)?);
				Ok(())
			} else if meta.path.is_ident("shared") {
				shared = if meta.input.peek(syn::Token![=]) {
					meta.value()?.parse::<LitBool>()?.value
				} else {
					true
				};
				Ok(())
			} else {
				Err(meta.error(
					"unknown argument, expected `topic`, `qos` or `shared`",
				))
			}
		})?;

		let topic = topic.ok_or_else(|| {
			syn::Error::new_spanned(attr, "missing required argument `topic = \"...\"`")
		})?;
		validate_topic(&topic)?;

		Ok(Self {
			topic,
			qos: qos.unwrap_or(QosLevel::AtLeastOnce),
			shared,
		})
	}
}

fn parse_qos(meta: &ParseNestedMeta<'_>) -> Result<QosLevel, syn::Error> {
	let value = meta.value()?;
	if value.peek(LitInt) {
		let level: LitInt = value.parse()?;
		return level
			.base10_parse::<u8>()
			.ok()
			.and_then(QosLevel::from_level)
			.ok_or_else(|| syn::Error::new_spanned(&level, "qos must be 0, 1 or 2"));
	}
	let name: syn::Ident = value.parse()?;
	QosLevel::from_name(&name.to_string()).ok_or_else(|| {
		syn::Error::new_spanned(
			&name,
			"qos must be 0, 1, 2, AtMostOnce, AtLeastOnce or ExactlyOnce",
		)
	})
}

fn validate_topic(topic: &LitStr) -> Result<(), syn::Error> {
	TopicFilter::new(topic.value()).map(|_| ()).map_err(|err| {
		syn::Error::new_spanned(topic, format!("Topic filter error: {err}"))
	})
}

/// One validated subscriber method
#[derive(Debug, Clone)]
pub struct SubscriberMethodInfo {
	/// Method name
	pub ident: syn::Ident,
	/// Marker arguments
	pub args: SubscribeArgs,
	/// Declared parameter types, in order, without the receiver
	pub param_types: Vec<Type>,
	/// True for `async fn`
	pub is_async: bool,
}

/// Everything the code generator needs about an `impl` block
#[derive(Debug)]
pub struct HandlerAnalysisContext {
	/// The impl block with all marker attributes removed
	pub item_impl: ItemImpl,
	/// Subscriber methods in declaration order
	pub methods: Vec<SubscriberMethodInfo>,
}

impl HandlerAnalysisContext {
	/// Analyzes an `impl` block annotated with `#[mqtt_handler]`.
	///
	/// # Validation Rules
	/// 1. Must be an inherent impl, not a trait impl
	/// 2. Subscriber methods take `&self`
	/// 3. Subscriber methods have no generic parameters
	/// 4. Parameter types are owned (no references, no `impl Trait`)
	/// 5. Topic filters are syntactically valid
	///
	/// Parameter count and kinds are checked at registration time, where
	/// every offending method of the handler is reported together.
	pub fn analyze(mut item_impl: ItemImpl) -> Result<Self, syn::Error> {
		if let Some((_, path, _)) = &item_impl.trait_ {
			return Err(syn::Error::new_spanned(
				path,
				"mqtt_handler must be applied to an inherent impl block, not a \
				 trait impl",
			));
		}

		let mut methods = Vec::new();
		let mut errors: Option<syn::Error> = None;
		for item in &mut item_impl.items {
			let ImplItem::Fn(method) = item else {
				continue;
			};
			match Self::analyze_method(method) {
				| Ok(Some(info)) => methods.push(info),
				| Ok(None) => {}
				| Err(err) => match errors.as_mut() {
					| Some(existing) => existing.combine(err),
					| None => errors = Some(err),
				},
			}
		}
		if let Some(err) = errors {
			return Err(err);
		}

		Ok(Self { item_impl, methods })
	}

	/// Strips the marker from a method and validates it.
	///
	/// Returns `None` for methods without the marker.
	fn analyze_method(
		method: &mut ImplItemFn,
	) -> Result<Option<SubscriberMethodInfo>, syn::Error> {
		let mut markers = Vec::new();
		method.attrs.retain(|attr| {
			if attr.path().is_ident(SUBSCRIBE_ATTRIBUTE) {
				markers.push(attr.clone());
				false
			} else {
				true
			}
		});
		let marker = match markers.as_slice() {
			| [] => return Ok(None),
			| [marker] => marker,
			| [_, duplicate, ..] => {
				return Err(syn::Error::new_spanned(
					duplicate,
					"a method can carry only one #[mqtt_subscribe]",
				));
			}
		};
		let args = SubscribeArgs::parse(marker)?;

		let sig = &method.sig;
		if !sig.generics.params.is_empty() {
			return Err(syn::Error::new_spanned(
				&sig.generics,
				"subscriber methods cannot be generic",
			));
		}
		Self::validate_receiver(sig)?;

		let param_types = sig
			.inputs
			.iter()
			.skip(1)
			.map(|input| match input {
				| FnArg::Typed(pat_type) => Self::validate_param_type(&pat_type.ty),
				| FnArg::Receiver(receiver) => Err(syn::Error::new_spanned(
					receiver,
					"unexpected receiver",
				)),
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Some(SubscriberMethodInfo {
			ident: sig.ident.clone(),
			args,
			param_types,
			is_async: sig.asyncness.is_some(),
		}))
	}

	fn validate_receiver(sig: &syn::Signature) -> Result<(), syn::Error> {
		match sig.inputs.first() {
			| Some(FnArg::Receiver(receiver))
				if receiver.reference.is_some() && receiver.mutability.is_none() =>
			{
				Ok(())
			}
			| Some(FnArg::Receiver(receiver)) => Err(syn::Error::new_spanned(
				receiver,
				"subscriber methods must take `&self`",
			)),
			| _ => Err(syn::Error::new(
				sig.ident.span(),
				"subscriber methods must take `&self` as their first parameter",
			)),
		}
	}

	fn validate_param_type(ty: &Type) -> Result<Type, syn::Error> {
		match ty {
			| Type::Reference(_) => Err(syn::Error::new(
				ty.span(),
				"subscriber parameters must be owned types, e.g. `String` instead \
				 of `&str`",
			)),
			| Type::ImplTrait(_) => Err(syn::Error::new(
				ty.span(),
				"subscriber parameters cannot use `impl Trait`",
			)),
			| _ => Ok(ty.clone()),
		}
	}
}
