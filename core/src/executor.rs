//! Bounded worker pool for handler execution
//!
//! Each accepted task waits for one of `workers` permits and then runs on
//! tokio's blocking pool, so handlers may block without stalling the
//! network event loop.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// What `shutdown` does with outstanding work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
	/// Stop accepting work and wait for queued and running tasks
	#[default]
	#[serde(alias = "GRACEFUL")]
	Graceful,
	/// Stop accepting work, drop queued tasks and return at once
	#[serde(alias = "IMMEDIATE")]
	Immediate,
}

/// Execution pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
	/// Maximum number of concurrently running tasks
	pub workers: usize,
	/// Shutdown behaviour
	pub policy: ShutdownPolicy,
	/// Upper bound for a graceful drain; `None` waits indefinitely
	pub drain_timeout: Option<Duration>,
}

impl Default for ExecutorSettings {
	fn default() -> Self {
		Self {
			workers: default_workers(),
			policy: ShutdownPolicy::default(),
			drain_timeout: None,
		}
	}
}

/// One worker per available core
pub fn default_workers() -> usize {
	std::thread::available_parallelism()
		.map(NonZeroUsize::get)
		.unwrap_or(1)
}

/// Task submitted after shutdown started
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Execution pool is shut down")]
pub struct RejectedExecution;

/// Worker pool that runs dispatch work off the network thread
#[derive(Debug)]
pub struct ExecutionPool {
	handle: Handle,
	permits: Arc<Semaphore>,
	tracker: TaskTracker,
	cancellation: CancellationToken,
	settings: ExecutorSettings,
}

impl ExecutionPool {
	/// Creates a pool on the current tokio runtime.
	///
	/// # Panics
	///
	/// Panics when called outside a tokio runtime.
	pub fn new(settings: ExecutorSettings) -> Self {
		Self::with_handle(Handle::current(), settings)
	}

	/// Creates a pool that spawns onto the given runtime.
	pub fn with_handle(handle: Handle, settings: ExecutorSettings) -> Self {
		let workers = settings.workers.max(1);
		debug!(workers, policy = ?settings.policy, "Creating mqtt execution pool");
		Self {
			handle,
			permits: Arc::new(Semaphore::new(workers)),
			tracker: TaskTracker::new(),
			cancellation: CancellationToken::new(),
			settings: ExecutorSettings { workers, ..settings },
		}
	}

	/// Queues a task. Fails once shutdown has started.
	pub fn execute<F>(&self, task: F) -> Result<(), RejectedExecution>
	where F: FnOnce() + Send + 'static {
		if self.tracker.is_closed() {
			return Err(RejectedExecution);
		}
		let permits = Arc::clone(&self.permits);
		let cancellation = self.cancellation.clone();
		self.tracker.spawn_on(
			async move {
				let permit = tokio::select! {
					biased;
					_ = cancellation.cancelled() => return,
					permit = permits.acquire_owned() => match permit {
						| Ok(permit) => permit,
						| Err(_) => return,
					},
				};
				let outcome = tokio::task::spawn_blocking(move || {
					let _permit = permit;
					task()
				})
				.await;
				if let Err(err) = outcome {
					error!(error = %err, "Mqtt worker task failed");
				}
			},
			&self.handle,
		);
		Ok(())
	}

	/// Number of tasks currently running
	pub fn active_count(&self) -> usize {
		self.settings.workers - self.permits.available_permits()
	}

	/// Number of accepted tasks not yet finished
	pub fn pending_count(&self) -> usize {
		self.tracker.len()
	}

	/// Returns false once shutdown has started
	pub fn is_running(&self) -> bool {
		!self.tracker.is_closed()
	}

	/// Pool settings
	pub fn settings(&self) -> &ExecutorSettings {
		&self.settings
	}

	/// Stops accepting work and applies the shutdown policy.
	pub async fn shutdown(&self) {
		self.tracker.close();
		match self.settings.policy {
			| ShutdownPolicy::Graceful => {
				if !self.tracker.is_empty() {
					info!(
						pending = self.pending_count(),
						"Commencing graceful shutdown. Waiting for active tasks to complete"
					);
				}
				match self.settings.drain_timeout {
					| Some(limit) => {
						if tokio::time::timeout(limit, self.tracker.wait())
							.await
							.is_err()
						{
							warn!(
								timeout_millis = limit.as_millis() as u64,
								pending = self.pending_count(),
								"Graceful shutdown timed out with tasks still running"
							);
							return;
						}
					}
					| None => self.tracker.wait().await,
				}
				info!("Graceful shutdown complete");
			}
			| ShutdownPolicy::Immediate => {
				self.cancellation.cancel();
				debug!(
					running = self.active_count(),
					pending = self.pending_count(),
					"Immediate shutdown, queued tasks dropped"
				);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::time::Instant;

	use super::*;

	fn pool(workers: usize, policy: ShutdownPolicy) -> ExecutionPool {
		ExecutionPool::new(ExecutorSettings {
			workers,
			policy,
			drain_timeout: None,
		})
	}

	#[tokio::test]
	async fn test_runs_submitted_tasks() {
		let pool = pool(2, ShutdownPolicy::Graceful);
		let counter = Arc::new(AtomicUsize::new(0));
		for _ in 0 .. 10 {
			let counter = Arc::clone(&counter);
			pool.execute(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			})
			.unwrap();
		}
		pool.shutdown().await;
		assert_eq!(counter.load(Ordering::SeqCst), 10);
		assert_eq!(pool.active_count(), 0);
	}

	#[tokio::test]
	async fn test_rejects_after_shutdown() {
		let pool = pool(1, ShutdownPolicy::Graceful);
		pool.shutdown().await;
		assert!(!pool.is_running());
		assert_eq!(pool.execute(|| {}), Err(RejectedExecution));
	}

	#[tokio::test]
	async fn test_graceful_waits_for_running_work() {
		let pool = pool(1, ShutdownPolicy::Graceful);
		let finished = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&finished);
		pool.execute(move || {
			std::thread::sleep(Duration::from_millis(100));
			flag.store(true, Ordering::SeqCst);
		})
		.unwrap();
		pool.execute(|| {}).unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert_eq!(pool.active_count(), 1);
		assert_eq!(pool.pending_count(), 2);

		pool.shutdown().await;
		assert!(finished.load(Ordering::SeqCst));
		assert_eq!(pool.pending_count(), 0);
	}

	#[tokio::test]
	async fn test_graceful_drain_timeout() {
		let pool = ExecutionPool::new(ExecutorSettings {
			workers: 1,
			policy: ShutdownPolicy::Graceful,
			drain_timeout: Some(Duration::from_millis(50)),
		});
		pool.execute(|| std::thread::sleep(Duration::from_millis(500)))
			.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;

		let started = Instant::now();
		pool.shutdown().await;
		assert!(started.elapsed() < Duration::from_millis(400));
	}

	#[tokio::test]
	async fn test_immediate_drops_queued_work() {
		let pool = pool(1, ShutdownPolicy::Immediate);
		pool.execute(|| std::thread::sleep(Duration::from_millis(150)))
			.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;

		let queued_ran = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&queued_ran);
		pool.execute(move || flag.store(true, Ordering::SeqCst))
			.unwrap();

		let started = Instant::now();
		pool.shutdown().await;
		assert!(started.elapsed() < Duration::from_millis(100));

		tokio::time::sleep(Duration::from_millis(300)).await;
		assert!(!queued_ran.load(Ordering::SeqCst));
	}
}
