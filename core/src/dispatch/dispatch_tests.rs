use std::sync::{Arc, Mutex};

use bytes::Bytes;
use rumqttc::QoS;

use super::{DispatchEngine, DispatchError, MessageError, MessageErrorKind};
use crate::adapter::MessageAdapter;
use crate::message::InboundMessage;
use crate::registry::{
	Invoker, MqttHandler, ParamSpec, SubscriberMethod, SubscriberRegistry,
	Subscription,
};
use crate::topic::Topic;

#[derive(Default)]
struct Recorder {
	ints: Mutex<Vec<i32>>,
	texts: Mutex<Vec<(String, String)>>,
	async_calls: Mutex<Vec<String>>,
}

impl MqttHandler for Recorder {
	fn subscriber_methods(self: Arc<Self>) -> Vec<SubscriberMethod> {
		let ints = Arc::clone(&self);
		let texts = Arc::clone(&self);
		let async_owner = Arc::clone(&self);
		vec![
			SubscriberMethod::new(
				"on_int",
				Subscription::new("int", QoS::ExactlyOnce),
				vec![ParamSpec::of::<i32>()],
				Invoker::blocking(move |message, adapter| {
					let value: i32 = adapter.decode(message)?;
					ints.ints.lock().unwrap().push(value);
					Ok(())
				}),
			),
			SubscriberMethod::new(
				"on_text",
				Subscription::new("text/+", QoS::AtLeastOnce),
				vec![ParamSpec::of::<Topic>(), ParamSpec::of::<String>()],
				Invoker::blocking(move |message, adapter| {
					let topic: Topic = adapter.decode(message)?;
					let text: String = adapter.decode(message)?;
					texts
						.texts
						.lock()
						.unwrap()
						.push((topic.to_string(), text));
					Ok(())
				}),
			),
			SubscriberMethod::new(
				"on_async",
				Subscription::new("async", QoS::AtMostOnce),
				vec![ParamSpec::of::<String>()],
				Invoker::suspending(move |message, adapter| {
					let owner = Arc::clone(&async_owner);
					let text = adapter.decode::<String>(message);
					Box::pin(async move {
						let text = text?;
						futures::future::ready(()).await;
						owner.async_calls.lock().unwrap().push(text);
						Ok::<(), DispatchError>(())
					})
				}),
			),
			SubscriberMethod::new(
				"on_fail",
				Subscription::new("fail", QoS::AtMostOnce),
				vec![],
				Invoker::blocking(|_, _| {
					Err(DispatchError::handler(std::io::Error::other("boom")))
				}),
			),
			SubscriberMethod::new(
				"on_panic",
				Subscription::new("panic", QoS::AtMostOnce),
				vec![],
				Invoker::blocking(|_, _| panic!("handler exploded")),
			),
		]
	}
}

struct Fixture {
	engine: DispatchEngine,
	recorder: Arc<Recorder>,
	errors: Arc<Mutex<Vec<MessageError>>>,
}

fn fixture() -> Fixture {
	let recorder = Arc::new(Recorder::default());
	let mut registry = SubscriberRegistry::new(None);
	registry.register(Arc::clone(&recorder)).unwrap();

	let errors = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&errors);
	let engine = DispatchEngine::new(
		Arc::new(registry),
		Arc::new(MessageAdapter::new()),
		Arc::new(move |err: MessageError| sink.lock().unwrap().push(err)),
	);
	Fixture {
		engine,
		recorder,
		errors,
	}
}

fn msg(topic: &str, payload: &'static str) -> InboundMessage {
	InboundMessage::new(topic, Bytes::from_static(payload.as_bytes()))
}

#[test]
fn test_decodes_and_invokes_subscriber() {
	let f = fixture();
	f.engine.handle(msg("int", "2"));
	assert_eq!(*f.recorder.ints.lock().unwrap(), vec![2]);
	assert!(f.errors.lock().unwrap().is_empty());
}

#[test]
fn test_topic_is_resolved_once() {
	let f = fixture();
	f.engine.handle(msg("int", "1"));
	f.engine.handle(msg("int", "2"));
	f.engine.handle(msg("int", "3"));
	assert_eq!(f.engine.resolution_count(), 1);

	f.engine.handle(msg("text/a", "x"));
	f.engine.handle(msg("text/b", "y"));
	f.engine.handle(msg("text/a", "z"));
	assert_eq!(f.engine.resolution_count(), 3);
	assert_eq!(f.engine.cached_topics(), 3);
}

/// Two overlapping filters; every hit records which method ran.
#[derive(Default)]
struct Overlap {
	hits: Mutex<Vec<&'static str>>,
}

impl MqttHandler for Overlap {
	fn subscriber_methods(self: Arc<Self>) -> Vec<SubscriberMethod> {
		["a_level", "b_tree"]
			.into_iter()
			.zip(["race/+", "race/#"])
			.map(|(name, filter)| {
				let owner = Arc::clone(&self);
				SubscriberMethod::new(
					name,
					Subscription::new(filter, QoS::AtMostOnce),
					vec![],
					Invoker::blocking(move |_, _| {
						owner.hits.lock().unwrap().push(name);
						Ok(())
					}),
				)
			})
			.collect()
	}
}

#[test]
fn test_concurrent_first_resolution_settles_on_one_subscriber() {
	const THREADS: usize = 16;
	const PER_THREAD: usize = 8;

	let overlap = Arc::new(Overlap::default());
	let mut registry = SubscriberRegistry::new(None);
	registry.register(Arc::clone(&overlap)).unwrap();
	let engine = DispatchEngine::new(
		Arc::new(registry),
		Arc::new(MessageAdapter::new()),
		Arc::new(|err: MessageError| panic!("unexpected failure: {err}")),
	);
	let start = std::sync::Barrier::new(THREADS);

	std::thread::scope(|scope| {
		for _ in 0 .. THREADS {
			scope.spawn(|| {
				start.wait();
				for _ in 0 .. PER_THREAD {
					engine.handle(msg("race/fresh", ""));
				}
			});
		}
	});

	assert_eq!(engine.cached_topics(), 1);
	assert!(engine.resolution_count() >= 1);
	let hits = overlap.hits.lock().unwrap();
	assert_eq!(hits.len(), THREADS * PER_THREAD);
	assert!(hits.iter().all(|name| *name == "a_level"));
}

#[test]
fn test_topic_and_payload_parameters() {
	let f = fixture();
	f.engine.handle(msg("text/kitchen", "hello"));
	assert_eq!(*f.recorder.texts.lock().unwrap(), vec![(
		"text/kitchen".to_string(),
		"hello".to_string()
	)]);
}

#[test]
fn test_parse_failure_is_reported_and_next_message_flows() {
	let f = fixture();
	f.engine.handle(msg("int", "not-json"));
	f.engine.handle(msg("int", "5"));

	let errors = f.errors.lock().unwrap();
	assert_eq!(errors.len(), 1);
	assert_eq!(errors[0].kind(), MessageErrorKind::PayloadParse);
	assert_eq!(errors[0].topic().as_str(), "int");
	assert_eq!(&errors[0].payload()[..], b"not-json");
	assert_eq!(
		errors[0].message(),
		"Error while handling mqtt message on topic [int]: Failed to parse payload"
	);
	assert_eq!(*f.recorder.ints.lock().unwrap(), vec![5]);
}

#[test]
fn test_mapping_failure_is_classified() {
	let f = fixture();
	f.engine.handle(msg("int", "{\"a\":1}"));
	let errors = f.errors.lock().unwrap();
	assert_eq!(errors[0].kind(), MessageErrorKind::PayloadMapping);
	assert!(errors[0].message().ends_with("Failed to map payload to target type"));
}

#[test]
fn test_handler_error_and_panic_are_contained() {
	let f = fixture();
	f.engine.handle(msg("fail", ""));
	f.engine.handle(msg("panic", ""));
	f.engine.handle(msg("int", "7"));

	let errors = f.errors.lock().unwrap();
	let kinds: Vec<_> = errors.iter().map(MessageError::kind).collect();
	assert_eq!(kinds, vec![MessageErrorKind::Handler, MessageErrorKind::Panicked]);
	assert_eq!(
		errors[0].message(),
		"Error while handling mqtt message on topic [fail]"
	);
	match errors[1].cause() {
		| DispatchError::Panicked(text) => assert_eq!(text, "handler exploded"),
		| other => panic!("unexpected cause {other:?}"),
	}
	assert_eq!(*f.recorder.ints.lock().unwrap(), vec![7]);
}

#[test]
fn test_suspending_handler_runs_to_completion() {
	let f = fixture();
	f.engine.handle(msg("async", "later"));
	assert_eq!(*f.recorder.async_calls.lock().unwrap(), vec!["later"]);
}

#[test]
fn test_suspending_handler_on_blocking_worker() {
	let runtime = tokio::runtime::Runtime::new().unwrap();
	let _guard = runtime.enter();
	let f = fixture();
	let engine = Arc::new(f.engine);
	let worker = Arc::clone(&engine);
	runtime
		.block_on(tokio::task::spawn_blocking(move || {
			worker.handle(msg("async", "pooled"))
		}))
		.unwrap();
	assert_eq!(*f.recorder.async_calls.lock().unwrap(), vec!["pooled"]);
}

#[test]
#[should_panic(expected = "No subscriber found for topic unknown")]
fn test_unmatched_topic_panics() {
	let f = fixture();
	f.engine.handle(msg("unknown", "1"));
}
