// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process queue tier.
//!
//! Publishing only enqueues; a [`QueueDrain`] worker moves records into the
//! durable sink in arrival order. A full or closed queue is a publish error,
//! which the fallback decorator turns into a direct write.
//!
//! A record the queue accepted is never dropped silently: transient durable
//! failures are retried with backoff, and a record that still cannot be
//! persisted goes to the last-resort sink when one is configured.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::AuditSinkError;
use crate::event::PermissionAuditRecord;
use crate::sink::AuditSink;

/// Backoff applied by the drain to transient durable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total publish attempts per record, including the first.
	pub max_attempts: u32,
	pub initial_backoff: Duration,
	pub max_backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			initial_backoff: Duration::from_millis(50),
			max_backoff: Duration::from_secs(2),
		}
	}
}

pub struct QueueAuditSink {
	tx: mpsc::Sender<Arc<PermissionAuditRecord>>,
	name: String,
}

/// The consuming half of a [`QueueAuditSink`].
pub struct QueueDrain {
	rx: mpsc::Receiver<Arc<PermissionAuditRecord>>,
	durable: Arc<dyn AuditSink>,
	last_resort: Option<Arc<dyn AuditSink>>,
	retry: RetryPolicy,
	shutdown: Arc<Notify>,
}

/// A running drain.
pub struct DrainHandle {
	shutdown: Arc<Notify>,
	task: JoinHandle<()>,
}

impl QueueAuditSink {
	/// A queue holding at most `capacity` records, drained into `durable`.
	/// The drain is not started.
	pub fn new(capacity: usize, durable: Arc<dyn AuditSink>) -> (Self, QueueDrain) {
		let (tx, rx) = mpsc::channel(capacity.max(1));
		(
			Self {
				tx,
				name: "queue".to_string(),
			},
			QueueDrain {
				rx,
				durable,
				last_resort: None,
				retry: RetryPolicy::default(),
				shutdown: Arc::new(Notify::new()),
			},
		)
	}

	/// Like [`QueueAuditSink::new`], with the drain running on the current runtime.
	pub fn spawn(capacity: usize, durable: Arc<dyn AuditSink>) -> (Self, DrainHandle) {
		let (sink, drain) = Self::new(capacity, durable);
		(sink, drain.spawn())
	}

	/// Records waiting for the drain.
	pub fn pending(&self) -> usize {
		self.tx.max_capacity() - self.tx.capacity()
	}
}

#[async_trait]
impl AuditSink for QueueAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	async fn publish(&self, record: Arc<PermissionAuditRecord>) -> Result<(), AuditSinkError> {
		self.tx.try_send(record).map_err(|e| match e {
			TrySendError::Full(_) => AuditSinkError::Transient("audit queue is at capacity".to_string()),
			TrySendError::Closed(_) => AuditSinkError::Permanent("audit queue is closed".to_string()),
		})
	}

	async fn health_check(&self) -> Result<(), AuditSinkError> {
		if self.tx.is_closed() {
			return Err(AuditSinkError::Permanent("audit queue is closed".to_string()));
		}
		Ok(())
	}
}

impl QueueDrain {
	/// Where records go once the durable sink has refused them for good.
	pub fn with_last_resort(mut self, sink: Arc<dyn AuditSink>) -> Self {
		self.last_resort = Some(sink);
		self
	}

	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	/// Run the drain on the current runtime.
	pub fn spawn(self) -> DrainHandle {
		let shutdown = Arc::clone(&self.shutdown);
		DrainHandle {
			shutdown,
			task: tokio::spawn(self.run()),
		}
	}

	/// Persist queued records until every sender is gone or shutdown is
	/// requested. On shutdown the queue stops accepting records and whatever
	/// it already holds is persisted before returning.
	pub async fn run(mut self) {
		let shutdown = Arc::clone(&self.shutdown);
		let mut closing = false;

		loop {
			let next = if closing {
				self.rx.recv().await
			} else {
				tokio::select! {
					record = self.rx.recv() => record,
					_ = shutdown.notified() => {
						debug!("audit queue shutting down, flushing pending records");
						self.rx.close();
						closing = true;
						continue;
					}
				}
			};

			match next {
				Some(record) => self.persist(record).await,
				None => break,
			}
		}
		debug!("audit queue closed, drain stopped");
	}

	async fn persist(&self, record: Arc<PermissionAuditRecord>) {
		let mut backoff = self.retry.initial_backoff;
		let mut attempt = 1;

		let err = loop {
			match self.durable.publish(Arc::clone(&record)).await {
				Ok(()) => return,
				Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
					debug!(
						sink = self.durable.name(),
						record_id = %record.id,
						attempt,
						error = %e,
						"retrying audit record"
					);
					tokio::time::sleep(backoff).await;
					backoff = (backoff * 2).min(self.retry.max_backoff);
					attempt += 1;
				}
				Err(e) => break e,
			}
		};

		warn!(
			sink = self.durable.name(),
			record_id = %record.id,
			operation = %record.operation,
			attempts = attempt,
			error = %err,
			"audit sink publish failed"
		);

		let Some(last_resort) = &self.last_resort else {
			error!(record_id = %record.id, operation = %record.operation, "audit record lost, no last-resort sink");
			return;
		};
		if let Err(e) = last_resort.publish(Arc::clone(&record)).await {
			error!(
				sink = last_resort.name(),
				record_id = %record.id,
				operation = %record.operation,
				error = %e,
				"audit record lost"
			);
		}
	}
}

impl DrainHandle {
	/// Stop accepting records, persist everything already queued and wait
	/// for the drain to finish.
	pub async fn shutdown(self) {
		self.shutdown.notify_one();
		self.wait().await;
	}

	/// Wait for the drain to stop on its own, once every sender is gone.
	pub async fn wait(self) {
		if let Err(e) = self.task.await {
			error!(error = %e, "audit drain task failed");
		}
	}

	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sink::testing::{FailingSink, RecordingSink};
	use hearth_server_auth::{AuthenticationContext, DecisionBuilder, Operation, ReasonCode};
	use proptest::prelude::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::time::sleep;

	fn record() -> Arc<PermissionAuditRecord> {
		let ctx = AuthenticationContext::anonymous();
		let result = DecisionBuilder::unscoped(&ctx, Operation::ContentRead).grant(ReasonCode::PublicContent);
		Arc::new(PermissionAuditRecord::from_decision(&result, &ctx, "content"))
	}

	#[tokio::test]
	async fn full_queue_is_a_transient_error() {
		let durable = Arc::new(RecordingSink::default());
		let (queue, _drain) = QueueAuditSink::new(1, durable);

		queue.publish(record()).await.unwrap();
		assert_eq!(queue.pending(), 1);

		let err = queue.publish(record()).await.unwrap_err();
		assert!(err.is_transient());
	}

	#[tokio::test]
	async fn closed_queue_is_a_permanent_error() {
		let durable = Arc::new(RecordingSink::default());
		let (queue, drain) = QueueAuditSink::new(8, durable);
		drop(drain);

		let err = queue.publish(record()).await.unwrap_err();
		assert!(!err.is_transient());
		assert!(queue.health_check().await.is_err());
	}

	#[tokio::test]
	async fn drain_persists_in_order() {
		let durable = Arc::new(RecordingSink::default());
		let (queue, handle) = QueueAuditSink::spawn(16, durable.clone());

		let sent: Vec<_> = (0..5).map(|_| record()).collect();
		for r in &sent {
			queue.publish(Arc::clone(r)).await.unwrap();
		}
		drop(queue);
		handle.wait().await;

		let ids: Vec<_> = durable.records().iter().map(|r| r.id).collect();
		let expected: Vec<_> = sent.iter().map(|r| r.id).collect();
		assert_eq!(ids, expected);
	}

	fn quick_retry(max_attempts: u32) -> RetryPolicy {
		RetryPolicy {
			max_attempts,
			initial_backoff: Duration::from_millis(1),
			max_backoff: Duration::from_millis(4),
		}
	}

	/// Fails the first `failures` publishes with a transient error, then records.
	struct Flaky {
		failures: AtomicUsize,
		inner: RecordingSink,
	}

	impl Flaky {
		fn failing(failures: usize) -> Self {
			Self {
				failures: AtomicUsize::new(failures),
				inner: RecordingSink::default(),
			}
		}
	}

	#[async_trait]
	impl AuditSink for Flaky {
		fn name(&self) -> &str {
			"flaky"
		}

		async fn publish(&self, record: Arc<PermissionAuditRecord>) -> Result<(), AuditSinkError> {
			let left = self.failures.load(Ordering::SeqCst);
			if left > 0 {
				self.failures.store(left - 1, Ordering::SeqCst);
				return Err(AuditSinkError::Transient("database is locked".to_string()));
			}
			self.inner.publish(record).await
		}
	}

	#[tokio::test]
	async fn transient_durable_failure_is_retried() {
		let durable = Arc::new(Flaky::failing(1));
		let (queue, drain) = QueueAuditSink::new(4, durable.clone());
		let handle = drain.with_retry(quick_retry(3)).spawn();

		let sent = record();
		queue.publish(Arc::clone(&sent)).await.unwrap();
		drop(queue);
		handle.wait().await;

		let persisted = durable.inner.records();
		assert_eq!(persisted.len(), 1);
		assert_eq!(persisted[0].id, sent.id);
	}

	#[tokio::test]
	async fn exhausted_retries_go_to_last_resort() {
		let last_resort = Arc::new(RecordingSink::default());
		let (queue, drain) = QueueAuditSink::new(4, Arc::new(Flaky::failing(usize::MAX)));
		let handle = drain
			.with_retry(quick_retry(3))
			.with_last_resort(last_resort.clone())
			.spawn();

		queue.publish(record()).await.unwrap();
		queue.publish(record()).await.unwrap();
		drop(queue);
		handle.wait().await;

		assert_eq!(last_resort.count(), 2);
	}

	#[tokio::test]
	async fn permanent_failure_skips_retries() {
		let last_resort = Arc::new(RecordingSink::default());
		let (queue, drain) = QueueAuditSink::new(4, Arc::new(FailingSink::permanent()));
		let handle = drain
			.with_retry(RetryPolicy {
				initial_backoff: Duration::from_secs(60),
				..RetryPolicy::default()
			})
			.with_last_resort(last_resort.clone())
			.spawn();

		queue.publish(record()).await.unwrap();
		drop(queue);
		tokio::time::timeout(Duration::from_secs(5), handle.wait())
			.await
			.unwrap();

		assert_eq!(last_resort.count(), 1);
	}

	#[tokio::test]
	async fn drain_survives_durable_failures() {
		let durable = Arc::new(FailingSink::transient());
		let (queue, drain) = QueueAuditSink::new(4, durable);
		let handle = drain.with_retry(quick_retry(2)).spawn();

		queue.publish(record()).await.unwrap();
		queue.publish(record()).await.unwrap();
		sleep(Duration::from_millis(20)).await;
		assert!(!handle.is_finished());

		drop(queue);
		handle.wait().await;
	}

	#[tokio::test]
	async fn shutdown_flushes_pending_and_closes_the_queue() {
		let durable = Arc::new(RecordingSink::default());
		let (queue, drain) = QueueAuditSink::new(8, durable.clone());

		for _ in 0..3 {
			queue.publish(record()).await.unwrap();
		}
		let handle = drain.spawn();
		handle.shutdown().await;

		assert_eq!(durable.count(), 3);
		let err = queue.publish(record()).await.unwrap_err();
		assert!(!err.is_transient());
		assert!(queue.health_check().await.is_err());
	}

	#[tokio::test]
	async fn zero_capacity_is_clamped() {
		let durable = Arc::new(RecordingSink::default());
		let (queue, _drain) = QueueAuditSink::new(0, durable);
		queue.publish(record()).await.unwrap();
	}

	proptest! {
		#[test]
		fn accepts_exactly_capacity_before_refusing(capacity in 1usize..32, extra in 1usize..8) {
			let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
			runtime.block_on(async {
				let durable = Arc::new(RecordingSink::default());
				let (queue, _drain) = QueueAuditSink::new(capacity, durable);

				for _ in 0..capacity {
					queue.publish(record()).await.unwrap();
				}
				assert_eq!(queue.pending(), capacity);

				for _ in 0..extra {
					assert!(queue.publish(record()).await.unwrap_err().is_transient());
				}
				assert_eq!(queue.pending(), capacity);
			});
		}
	}
}
