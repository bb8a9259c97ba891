// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::AuditSinkError;
use crate::event::PermissionAuditRecord;
use crate::sink::AuditSink;

/// Which tier accepted a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTier {
	Primary,
	Fallback,
}

/// Tries `primary`; on any error hands the same record to `fallback`.
pub struct FallbackAuditSink {
	primary: Arc<dyn AuditSink>,
	fallback: Arc<dyn AuditSink>,
	name: String,
}

impl FallbackAuditSink {
	pub fn new(primary: Arc<dyn AuditSink>, fallback: Arc<dyn AuditSink>) -> Self {
		let name = format!("{}+{}", primary.name(), fallback.name());
		Self {
			primary,
			fallback,
			name,
		}
	}

	pub fn fallback(&self) -> &Arc<dyn AuditSink> {
		&self.fallback
	}

	/// Deliver `record`, reporting which tier took it.
	///
	/// The error, if any, is the fallback's; the primary's is only logged.
	pub async fn deliver(&self, record: Arc<PermissionAuditRecord>) -> Result<DeliveryTier, AuditSinkError> {
		match self.primary.publish(Arc::clone(&record)).await {
			Ok(()) => Ok(DeliveryTier::Primary),
			Err(e) => {
				warn!(
					sink = self.primary.name(),
					fallback = self.fallback.name(),
					record_id = %record.id,
					error = %e,
					"audit publish failed, writing directly"
				);
				self.fallback.publish(record).await?;
				Ok(DeliveryTier::Fallback)
			}
		}
	}
}

#[async_trait]
impl AuditSink for FallbackAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	async fn publish(&self, record: Arc<PermissionAuditRecord>) -> Result<(), AuditSinkError> {
		self.deliver(record).await.map(|_| ())
	}

	/// Healthy while at least the fallback is.
	async fn health_check(&self) -> Result<(), AuditSinkError> {
		if let Err(e) = self.primary.health_check().await {
			warn!(sink = self.primary.name(), error = %e, "primary audit sink unhealthy");
		}
		self.fallback.health_check().await
	}
}
