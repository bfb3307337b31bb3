use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing based on environment or explicit configuration
///
/// Priority (first match wins):
/// 1. If `force_level` provided - use it
/// 2. If RUST_LOG_DISABLE=1 - disable tracing completely
/// 3. If RUST_LOG set - use environment configuration
/// 4. Otherwise - warnings and errors only
///
/// # Examples
/// ```bash
/// RUST_LOG=mqtt_dispatch_core=debug cargo run --example hello_handler
/// ```
pub fn setup(force_level: Option<&str>) {
	super::config::load_env_files();

	if std::env::var("RUST_LOG_DISABLE").is_ok() {
		return;
	}

	let filter = match force_level {
		| Some(level) => tracing_subscriber::EnvFilter::new(level),
		| None => tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| "warn".into()),
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(
			tracing_subscriber::fmt::layer()
				.with_target(true)
				.with_thread_ids(false)
				.with_thread_names(true)
				.compact(),
		)
		.init();
}
