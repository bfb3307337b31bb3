//! Per-publish options

use bytes::Bytes;

/// MQTT 5 payload format indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadFormat {
	/// Unspecified bytes
	Unspecified = 0,
	/// UTF-8 encoded character data
	Utf8 = 1,
}

/// Per-message publish options.
///
/// `retain` works with every protocol version; the remaining fields are
/// MQTT 5 properties and are rejected by MQTT 3 publishers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
	/// Retain flag
	pub retain: bool,
	/// Message expiry interval in seconds
	pub message_expiry_interval: Option<u32>,
	/// Payload format indicator
	pub payload_format_indicator: Option<PayloadFormat>,
	/// Content type
	pub content_type: Option<String>,
	/// Response topic for request/response
	pub response_topic: Option<String>,
	/// Correlation data for request/response
	pub correlation_data: Option<Bytes>,
	/// User properties, in order
	pub user_properties: Vec<(String, String)>,
}

impl PublishOptions {
	/// Options with every field unset
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the retain flag.
	pub fn retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}

	/// Sets the message expiry interval.
	pub fn message_expiry_interval(mut self, seconds: u32) -> Self {
		self.message_expiry_interval = Some(seconds);
		self
	}

	/// Sets the payload format indicator.
	pub fn payload_format(mut self, format: PayloadFormat) -> Self {
		self.payload_format_indicator = Some(format);
		self
	}

	/// Sets the content type.
	pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());
		self
	}

	/// Sets the response topic.
	pub fn response_topic(mut self, topic: impl Into<String>) -> Self {
		self.response_topic = Some(topic.into());
		self
	}

	/// Sets the correlation data.
	pub fn correlation_data(mut self, data: impl Into<Bytes>) -> Self {
		self.correlation_data = Some(data.into());
		self
	}

	/// Appends a user property.
	pub fn user_property(
		mut self,
		key: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		self.user_properties.push((key.into(), value.into()));
		self
	}

	/// Name of the first MQTT 5 only option that is set
	pub fn first_v5_only_option(&self) -> Option<&'static str> {
		if self.message_expiry_interval.is_some() {
			Some("message_expiry_interval")
		} else if self.payload_format_indicator.is_some() {
			Some("payload_format_indicator")
		} else if self.content_type.is_some() {
			Some("content_type")
		} else if self.response_topic.is_some() {
			Some("response_topic")
		} else if self.correlation_data.is_some() {
			Some("correlation_data")
		} else if !self.user_properties.is_empty() {
			Some("user_properties")
		} else {
			None
		}
	}
}
