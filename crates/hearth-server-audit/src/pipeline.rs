// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::{AuditError, AuditResult};
use crate::event::PermissionAuditRecord;
use crate::sink::fallback::{DeliveryTier, FallbackAuditSink};
use crate::sink::queue::DrainHandle;
use crate::sink::AuditSink;
use hearth_server_auth::{
	safe_permission_check, AuthResult, AuthenticationContext, DecisionBuilder, PermissionResult,
};
use hearth_server_config::AuditConfig;

/// Per-call audit switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditOptions {
	pub enabled: bool,
	/// Publish to the queue first. When false, write straight to the durable sink.
	pub asynchronous: bool,
}

impl AuditOptions {
	pub fn disabled() -> Self {
		Self {
			enabled: false,
			asynchronous: false,
		}
	}

	pub fn synchronous() -> Self {
		Self {
			enabled: true,
			asynchronous: false,
		}
	}
}

impl From<&AuditConfig> for AuditOptions {
	fn from(config: &AuditConfig) -> Self {
		Self {
			enabled: config.enabled,
			asynchronous: config.asynchronous,
		}
	}
}

impl Default for AuditOptions {
	fn default() -> Self {
		Self::from(&AuditConfig::default())
	}
}

/// Where an audited decision ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditDelivery {
	/// Audit was disabled for this call.
	Skipped,
	/// Accepted by the queue; the drain persists it later.
	Queued,
	/// Persisted directly, either by request or after the queue refused it.
	Written,
}

/// Records permission decisions with queue-then-direct-write delivery.
pub struct PermissionAuditor {
	sink: FallbackAuditSink,
	defaults: AuditOptions,
	drain: Mutex<Option<DrainHandle>>,
}

impl PermissionAuditor {
	/// `queue` is tried first for asynchronous delivery; `durable` takes
	/// synchronous writes and anything the queue refuses.
	pub fn new(queue: Arc<dyn AuditSink>, durable: Arc<dyn AuditSink>, defaults: AuditOptions) -> Self {
		Self {
			sink: FallbackAuditSink::new(queue, durable),
			defaults,
			drain: Mutex::new(None),
		}
	}

	/// Attach the drain feeding `queue`, so [`PermissionAuditor::shutdown`]
	/// can flush it.
	pub fn with_drain(self, drain: DrainHandle) -> Self {
		Self {
			drain: Mutex::new(Some(drain)),
			..self
		}
	}

	/// An auditor writing to SQLite, with a queue sized from `config` drained
	/// into the same pool. Records the drain cannot persist are appended to
	/// `config.spill_path` when set. Must be called inside a tokio runtime.
	#[cfg(feature = "sink-sqlite")]
	pub fn sqlite(pool: sqlx::SqlitePool, config: &AuditConfig) -> AuditResult<Self> {
		use crate::sink::file::FileAuditSink;
		use crate::sink::queue::QueueAuditSink;
		use crate::sink::sqlite::SqliteAuditSink;

		if config.enabled && config.asynchronous && config.queue_capacity == 0 {
			return Err(AuditError::ConfigError(
				"queue_capacity must be at least 1 for asynchronous audit".to_string(),
			));
		}

		let durable: Arc<dyn AuditSink> = Arc::new(SqliteAuditSink::new(pool));
		let (queue, mut drain) = QueueAuditSink::new(config.queue_capacity, Arc::clone(&durable));
		if let Some(path) = &config.spill_path {
			drain = drain.with_last_resort(Arc::new(FileAuditSink::new(path)));
		}
		Ok(Self::new(Arc::new(queue), durable, AuditOptions::from(config)).with_drain(drain.spawn()))
	}

	/// Flush queued records and stop the drain. Later asynchronous audits
	/// fall back to direct writes.
	pub async fn shutdown(&self) {
		let drain = self.drain.lock().await.take();
		if let Some(drain) = drain {
			drain.shutdown().await;
			debug!("permission auditor drained");
		}
	}

	/// The options used by [`PermissionAuditor::check_and_audit`].
	pub fn defaults(&self) -> AuditOptions {
		self.defaults
	}

	/// Record `result`.
	///
	/// Asynchronous mode publishes to the queue and falls back to a direct
	/// write on any publish failure. An error means the decision was not
	/// recorded anywhere.
	#[instrument(
		level = "debug",
		skip_all,
		fields(operation = %result.operation(), granted = result.is_granted(), resource_type = %resource_type)
	)]
	pub async fn audit_permission(
		&self,
		result: &PermissionResult,
		ctx: &AuthenticationContext,
		resource_type: &str,
		options: AuditOptions,
	) -> AuditResult<AuditDelivery> {
		if !options.enabled {
			return Ok(AuditDelivery::Skipped);
		}

		let record = Arc::new(PermissionAuditRecord::from_decision(result, ctx, resource_type));

		let delivery = if options.asynchronous {
			let tier = self.sink.deliver(record).await.map_err(|e| AuditError::SinkError {
				sink: self.sink.name().to_string(),
				source: e,
			})?;
			match tier {
				DeliveryTier::Primary => AuditDelivery::Queued,
				DeliveryTier::Fallback => AuditDelivery::Written,
			}
		} else {
			let durable = self.sink.fallback();
			durable.publish(record).await.map_err(|e| AuditError::SinkError {
				sink: durable.name().to_string(),
				source: e,
			})?;
			AuditDelivery::Written
		};

		debug!(?delivery, "permission decision audited");
		Ok(delivery)
	}

	/// Run `check` fail-closed, audit the outcome with the default options,
	/// and return the outcome. Audit failures are logged and never alter it.
	pub async fn check_and_audit<F>(
		&self,
		ctx: &AuthenticationContext,
		fallback: DecisionBuilder,
		check: F,
	) -> PermissionResult
	where
		F: Future<Output = AuthResult<PermissionResult>>,
	{
		let resource_type = fallback.operation().resource_type();
		let result = safe_permission_check(check, fallback).await;

		if let Err(e) = self
			.audit_permission(&result, ctx, resource_type, self.defaults)
			.await
		{
			warn!(
				operation = %result.operation(),
				granted = result.is_granted(),
				error = %e,
				"permission decision could not be audited"
			);
		}

		result
	}
}
