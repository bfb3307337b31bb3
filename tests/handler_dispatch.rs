//! End-to-end dispatch through `#[mqtt_handler]` handlers over the loopback client

use std::sync::{Arc, Mutex};

use mqtt_dispatch::advanced::LoopbackClient;
use mqtt_dispatch::prelude::*;
use mqtt_dispatch::{HealthStatus, MessageErrorKind, MqttClientError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Greeting {
	name: String,
}

#[derive(Default)]
struct Recorder {
	ints: Mutex<Vec<i32>>,
	greetings: Mutex<Vec<(String, String)>>,
	raw: Mutex<Vec<(String, usize)>>,
	jobs: Mutex<Vec<Bytes>>,
}

#[mqtt_handler]
impl Recorder {
	#[mqtt_subscribe(topic = "int", qos = 2)]
	fn on_int(&self, value: i32) {
		self.ints.lock().unwrap().push(value);
	}

	#[mqtt_subscribe(topic = "greetings/+")]
	fn on_greeting(&self, topic: Topic, greeting: Json<Greeting>) -> Result<(), std::io::Error> {
		if greeting.name.is_empty() {
			return Err(std::io::Error::other("anonymous greeting"));
		}
		self.greetings
			.lock()
			.unwrap()
			.push((topic.to_string(), greeting.into_inner().name));
		Ok(())
	}

	#[mqtt_subscribe(topic = "raw/#", qos = 0)]
	async fn on_raw(&self, message: InboundMessage) {
		tokio::task::yield_now().await;
		self.raw
			.lock()
			.unwrap()
			.push((message.topic().to_string(), message.payload().len()));
	}

	#[mqtt_subscribe(topic = "jobs", shared)]
	fn on_job(&self, payload: Bytes) {
		self.jobs.lock().unwrap().push(payload);
	}

	#[mqtt_subscribe(topic = "explode")]
	fn on_explode(&self) {
		panic!("handler exploded");
	}

	fn helper(&self) -> usize {
		self.ints.lock().unwrap().len()
	}
}

type Failures = Arc<Mutex<Vec<(String, MessageErrorKind)>>>;

fn config() -> MqttConfig {
	let mut config = MqttConfig::localhost();
	config.shared_group = Some("workers".to_string());
	config.worker_threads = Some(2);
	config
}

async fn started(
	recorder: Arc<Recorder>,
) -> (MqttRuntime, Arc<LoopbackClient>, Failures) {
	let client = Arc::new(LoopbackClient::default());
	let failures: Failures = Arc::default();
	let sink = Arc::clone(&failures);
	let runtime = MqttRuntime::builder(config())
		.handler(recorder)
		.error_handler(move |error: MessageError| {
			sink.lock()
				.unwrap()
				.push((error.topic().to_string(), error.kind()));
		})
		.wire_client(client.clone())
		.build()
		.unwrap();
	runtime.start().await.unwrap();
	(runtime, client, failures)
}

#[tokio::test]
async fn test_publish_reaches_typed_subscriber() {
	let recorder = Arc::new(Recorder::default());
	let (runtime, client, failures) = started(Arc::clone(&recorder)).await;

	runtime
		.publisher()
		.publish("int", QoS::ExactlyOnce, &1i32, None)
		.await
		.unwrap();
	runtime.shutdown().await.unwrap();

	assert_eq!(*recorder.ints.lock().unwrap(), vec![1]);
	assert_eq!(recorder.helper(), 1);
	assert!(failures.lock().unwrap().is_empty());

	let mut subscriptions = client.subscriptions();
	subscriptions.sort_by(|a, b| a.0.cmp(&b.0));
	assert_eq!(subscriptions, vec![
		("$share/workers/jobs".to_string(), QoS::AtLeastOnce),
		("explode".to_string(), QoS::AtLeastOnce),
		("greetings/+".to_string(), QoS::AtLeastOnce),
		("int".to_string(), QoS::ExactlyOnce),
		("raw/#".to_string(), QoS::AtMostOnce),
	]);
}

#[tokio::test]
async fn test_parameter_kinds_are_bound() {
	let recorder = Arc::new(Recorder::default());
	let (runtime, _client, failures) = started(Arc::clone(&recorder)).await;
	let publisher = runtime.publisher().clone();

	publisher
		.publish(
			"greetings/en",
			QoS::AtLeastOnce,
			&serde_json::json!({ "name": "alice" }),
			None,
		)
		.await
		.unwrap();
	publisher
		.publish("raw/a/b", QoS::AtMostOnce, b"\x00\x01\x02".as_slice(), None)
		.await
		.unwrap();
	publisher
		.publish("jobs", QoS::AtLeastOnce, "job-1", None)
		.await
		.unwrap();
	runtime.shutdown().await.unwrap();

	assert_eq!(*recorder.greetings.lock().unwrap(), vec![(
		"greetings/en".to_string(),
		"alice".to_string()
	)]);
	assert_eq!(*recorder.raw.lock().unwrap(), vec![("raw/a/b".to_string(), 3)]);
	assert_eq!(*recorder.jobs.lock().unwrap(), vec![Bytes::from_static(b"job-1")]);
	assert!(failures.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failures_are_isolated_per_message() {
	let recorder = Arc::new(Recorder::default());
	let (runtime, _client, failures) = started(Arc::clone(&recorder)).await;
	let publisher = runtime.publisher().clone();

	publisher
		.publish("greetings/bad", QoS::AtLeastOnce, "{not json", None)
		.await
		.unwrap();
	publisher
		.publish(
			"greetings/typed",
			QoS::AtLeastOnce,
			&serde_json::json!({ "name": 5 }),
			None,
		)
		.await
		.unwrap();
	publisher
		.publish(
			"greetings/empty",
			QoS::AtLeastOnce,
			&serde_json::json!({ "name": "" }),
			None,
		)
		.await
		.unwrap();
	publisher
		.publish("explode", QoS::AtLeastOnce, "", None)
		.await
		.unwrap();
	publisher
		.publish("int", QoS::AtLeastOnce, &7i32, None)
		.await
		.unwrap();
	runtime.shutdown().await.unwrap();

	let mut failures = failures.lock().unwrap().clone();
	failures.sort_by(|a, b| a.0.cmp(&b.0));
	assert_eq!(failures, vec![
		("explode".to_string(), MessageErrorKind::Panicked),
		("greetings/bad".to_string(), MessageErrorKind::PayloadParse),
		("greetings/empty".to_string(), MessageErrorKind::Handler),
		("greetings/typed".to_string(), MessageErrorKind::PayloadMapping),
	]);
	assert_eq!(*recorder.ints.lock().unwrap(), vec![7]);
	assert!(recorder.greetings.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_lifecycle_is_reflected_in_health() {
	let recorder = Arc::new(Recorder::default());
	let (runtime, _client, _failures) = started(recorder).await;
	assert!(runtime.is_running());
	assert_eq!(runtime.health().status, HealthStatus::Up);
	assert_eq!(runtime.registry().len(), 5);

	runtime.shutdown().await.unwrap();
	assert!(!runtime.is_running());
	assert_eq!(runtime.health().status, HealthStatus::Down);

	let result = runtime
		.publisher()
		.publish("int", QoS::AtMostOnce, &1i32, None)
		.await;
	assert!(matches!(result, Err(MqttClientError::NotConnected)));
}

struct Broken;

#[mqtt_handler]
impl Broken {
	#[mqtt_subscribe(topic = "a")]
	fn too_many_payloads(&self, first: String, second: Bytes) {
		let _ = (first, second);
	}

	#[mqtt_subscribe(topic = "b/+")]
	fn two_topics(&self, first: Topic, second: Topic) {
		let _ = (first, second);
	}

	#[mqtt_subscribe(topic = "c")]
	fn fine(&self, value: i64) {
		let _ = value;
	}
}

#[tokio::test]
async fn test_invalid_handler_fails_build_naming_every_method() {
	let result = MqttRuntime::builder(config())
		.handler(Arc::new(Broken))
		.wire_client(Arc::new(LoopbackClient::default()))
		.build();

	let Err(MqttClientError::Registration(error)) = result else {
		panic!("registration should fail");
	};
	let methods: Vec<&str> = error.methods().collect();
	assert_eq!(methods, vec!["Broken::too_many_payloads", "Broken::two_topics"]);
	assert!(error
		.to_string()
		.starts_with("Following subscribers are invalid [Broken::too_many_payloads ("));
}

struct Specific {
	hits: Mutex<Vec<String>>,
}

#[mqtt_handler]
impl Specific {
	#[mqtt_subscribe(topic = "home/kitchen/temp")]
	fn on_kitchen(&self, topic: Topic) {
		self.hits.lock().unwrap().push(format!("specific:{topic}"));
	}
}

struct CatchAll {
	hits: Mutex<Vec<String>>,
}

#[mqtt_handler]
impl CatchAll {
	#[mqtt_subscribe(topic = "home/#")]
	fn on_home(&self, topic: Topic) {
		self.hits.lock().unwrap().push(format!("catch_all:{topic}"));
	}
}

#[tokio::test]
async fn test_first_registered_filter_wins() {
	let specific = Arc::new(Specific {
		hits: Mutex::new(Vec::new()),
	});
	let catch_all = Arc::new(CatchAll {
		hits: Mutex::new(Vec::new()),
	});
	let mut config = config();
	config.worker_threads = Some(1);
	let runtime = MqttRuntime::builder(config)
		.handler(Arc::clone(&specific))
		.handler(Arc::clone(&catch_all))
		.wire_client(Arc::new(LoopbackClient::default()))
		.build()
		.unwrap();
	runtime.start().await.unwrap();

	let publisher = runtime.publisher();
	for topic in ["home/kitchen/temp", "home/garage", "home/kitchen/temp"] {
		publisher
			.publish(topic, QoS::AtLeastOnce, "x", None)
			.await
			.unwrap();
	}
	runtime.shutdown().await.unwrap();

	let mut specific_hits = specific.hits.lock().unwrap().clone();
	specific_hits.sort();
	assert_eq!(specific_hits, vec![
		"specific:home/kitchen/temp".to_string(),
		"specific:home/kitchen/temp".to_string(),
	]);
	assert_eq!(*catch_all.hits.lock().unwrap(), vec!["catch_all:home/garage".to_string()]);
	assert_eq!(runtime.engine().cached_topics(), 2);
	assert_eq!(runtime.engine().resolution_count(), 2);
}
