use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::{AdapterError, FromMqttMessage, Json, MessageAdapter, ParamKind};
use crate::message::InboundMessage;
use crate::topic::Topic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Reading {
	sensor: String,
	value: f64,
}

fn message(topic: &str, payload: &'static [u8]) -> InboundMessage {
	InboundMessage::new(topic, Bytes::from_static(payload))
}

#[test]
fn test_decodes_structured_scalar() {
	let adapter = MessageAdapter::new();
	let value: i32 = adapter.decode(&message("int", b"2")).unwrap();
	assert_eq!(value, 2);

	let flag: bool = adapter.decode(&message("flag", b"true")).unwrap();
	assert!(flag);
}

#[test]
fn test_topic_bytes_and_text_parameters() {
	let adapter = MessageAdapter::new();
	let msg = message("sensors/kitchen", b"hello");

	let topic: Topic = adapter.decode(&msg).unwrap();
	assert_eq!(topic.as_str(), "sensors/kitchen");

	let raw: Bytes = adapter.decode(&msg).unwrap();
	assert_eq!(&raw[..], b"hello");

	let vec: Vec<u8> = adapter.decode(&msg).unwrap();
	assert_eq!(vec, b"hello".to_vec());

	let text: String = adapter.decode(&msg).unwrap();
	assert_eq!(text, "hello");

	let whole: InboundMessage = adapter.decode(&msg).unwrap();
	assert_eq!(whole, msg);
}

#[test]
fn test_text_is_not_json_decoded() {
	let adapter = MessageAdapter::new();
	// A JSON string literal stays quoted when read as text
	let text: String = adapter.decode(&message("t", b"\"quoted\"")).unwrap();
	assert_eq!(text, "\"quoted\"");
}

#[test]
fn test_param_kinds() {
	assert_eq!(<Topic as FromMqttMessage>::KIND, ParamKind::Topic);
	assert_eq!(<String as FromMqttMessage>::KIND, ParamKind::Payload);
	assert_eq!(<Bytes as FromMqttMessage>::KIND, ParamKind::Payload);
	assert_eq!(<Json<Reading> as FromMqttMessage>::KIND, ParamKind::Payload);
	assert_eq!(<InboundMessage as FromMqttMessage>::KIND, ParamKind::RawMessage);
}

#[test]
fn test_malformed_payload_is_parse_failure() {
	let adapter = MessageAdapter::new();
	let err = adapter
		.decode::<Json<Reading>>(&message("r", b"not-json"))
		.unwrap_err();
	assert!(err.is_parse_failure(), "{err:?}");

	let truncated = adapter
		.decode::<Json<Reading>>(&message("r", b"{\"sensor\":"))
		.unwrap_err();
	assert!(truncated.is_parse_failure(), "{truncated:?}");
}

#[test]
fn test_wrong_shape_is_mapping_failure() {
	let adapter = MessageAdapter::new();
	let err = adapter
		.decode::<Json<Reading>>(&message("r", b"{\"sensor\":\"a\"}"))
		.unwrap_err();
	assert!(err.is_mapping_failure(), "{err:?}");

	let err = adapter.decode::<i32>(&message("int", b"\"two\"")).unwrap_err();
	assert!(err.is_mapping_failure(), "{err:?}");
}

#[test]
fn test_invalid_utf8_text() {
	let adapter = MessageAdapter::new();
	let err = adapter
		.decode::<String>(&message("t", &[0xff, 0xfe]))
		.unwrap_err();
	assert!(matches!(err, AdapterError::InvalidUtf8(_)));
	assert!(err.is_parse_failure());
}

#[test]
fn test_encode_rules() {
	let adapter = MessageAdapter::new();

	assert_eq!(&adapter.encode("plain").unwrap()[..], b"plain");
	assert_eq!(&adapter.encode(&String::from("s")).unwrap()[..], b"s");
	assert_eq!(
		&adapter.encode(&Bytes::from_static(b"\x01\x02")).unwrap()[..],
		b"\x01\x02"
	);
	assert_eq!(&adapter.encode(&1i32).unwrap()[..], b"1");
	assert_eq!(
		&adapter
			.encode(&Json(Reading {
				sensor: "a".into(),
				value: 1.5,
			}))
			.unwrap()[..],
		br#"{"sensor":"a","value":1.5}"#
	);
}

#[test]
fn test_structured_value_survives_publish_and_delivery() {
	let adapter = MessageAdapter::new();
	let reading = Json(Reading {
		sensor: "hall".into(),
		value: -3.25,
	});
	let payload = adapter.encode(&reading).unwrap();
	let decoded: Json<Reading> =
		adapter.decode(&InboundMessage::new("r", payload)).unwrap();
	assert_eq!(decoded, reading);
}
