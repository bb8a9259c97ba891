// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AuditSinkError;
use crate::event::PermissionAuditRecord;
use crate::sink::AuditSink;

/// Direct writes into `permission_audit_logs`.
pub struct SqliteAuditSink {
	pool: SqlitePool,
	name: String,
}

impl SqliteAuditSink {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			name: "sqlite".to_string(),
		}
	}
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	async fn publish(&self, record: Arc<PermissionAuditRecord>) -> Result<(), AuditSinkError> {
		let metadata_json = record
			.metadata
			.as_ref()
			.map(serde_json::to_string)
			.transpose()
			.map_err(|e| AuditSinkError::Permanent(format!("failed to serialize metadata: {e}")))?;

		let now = chrono::Utc::now();

		sqlx::query(
			r#"
			INSERT INTO permission_audit_logs (
				id, timestamp, actor_user_id, resource_type, resource_id, operation,
				granted, reason, reason_code, metadata,
				request_id, session_id, ip_address, user_agent, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(record.id.to_string())
		.bind(record.timestamp.to_rfc3339())
		.bind(record.actor_user_id.as_ref().map(|u| u.to_string()))
		.bind(&record.resource_type)
		.bind(&record.resource_id)
		.bind(&record.operation)
		.bind(record.granted)
		.bind(&record.reason)
		.bind(&record.reason_code)
		.bind(&metadata_json)
		.bind(&record.request_id)
		.bind(&record.session_id)
		.bind(&record.ip_address)
		.bind(&record.user_agent)
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| {
			if is_transient_error(&e) {
				AuditSinkError::Transient(format!("database error: {e}"))
			} else {
				AuditSinkError::Permanent(format!("database error: {e}"))
			}
		})?;

		Ok(())
	}

	async fn health_check(&self) -> Result<(), AuditSinkError> {
		sqlx::query("SELECT 1")
			.execute(&self.pool)
			.await
			.map_err(|e| AuditSinkError::Transient(format!("health check failed: {e}")))?;
		Ok(())
	}
}

fn is_transient_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Io(_) => true,
		sqlx::Error::PoolTimedOut => true,
		sqlx::Error::PoolClosed => true,
		sqlx::Error::Database(db_err) => {
			let msg = db_err.message().to_lowercase();
			msg.contains("busy") || msg.contains("locked") || msg.contains("timeout")
		}
		_ => false,
	}
}
