// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read side of the permission audit trail.

use chrono::{DateTime, Utc};
use hearth_server_audit::PermissionAuditRecord;
use hearth_server_auth::UserId;
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 1000;

/// Filters for [`AuditRepository::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
	pub actor_id: Option<UserId>,
	pub resource_type: Option<String>,
	pub resource_id: Option<String>,
	pub operation: Option<String>,
	pub granted: Option<bool>,
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

impl AuditQuery {
	pub fn for_actor(actor_id: UserId) -> Self {
		Self {
			actor_id: Some(actor_id),
			..Default::default()
		}
	}

	pub fn for_resource(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
		Self {
			resource_type: Some(resource_type.into()),
			resource_id: Some(resource_id.into()),
			..Default::default()
		}
	}
}

pub struct AuditRepository {
	pool: SqlitePool,
}

impl AuditRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Matching records, newest first, and the total number of matches.
	#[tracing::instrument(skip(self))]
	pub async fn query(&self, filter: &AuditQuery) -> Result<(Vec<PermissionAuditRecord>, i64), DbError> {
		let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
		let offset = filter.offset.unwrap_or(0).max(0);

		let mut conditions = vec!["1=1"];
		let mut params: Vec<String> = Vec::new();
		if let Some(v) = filter.actor_id {
			conditions.push("actor_user_id = ?");
			params.push(v.to_string());
		}
		if let Some(v) = &filter.resource_type {
			conditions.push("resource_type = ?");
			params.push(v.clone());
		}
		if let Some(v) = &filter.resource_id {
			conditions.push("resource_id = ?");
			params.push(v.clone());
		}
		if let Some(v) = &filter.operation {
			conditions.push("operation = ?");
			params.push(v.clone());
		}
		if let Some(v) = filter.from {
			conditions.push("timestamp >= ?");
			params.push(v.to_rfc3339());
		}
		if let Some(v) = filter.to {
			conditions.push("timestamp <= ?");
			params.push(v.to_rfc3339());
		}
		// Bound as an integer below, after the string params.
		if filter.granted.is_some() {
			conditions.push("granted = ?");
		}

		let where_clause = conditions.join(" AND ");

		let count_sql = format!("SELECT COUNT(*) AS cnt FROM permission_audit_logs WHERE {where_clause}");
		let mut count_query = sqlx::query(&count_sql);
		for p in &params {
			count_query = count_query.bind(p);
		}
		if let Some(granted) = filter.granted {
			count_query = count_query.bind(granted);
		}
		let total: i64 = count_query.fetch_one(&self.pool).await?.try_get("cnt")?;

		let data_sql = format!(
			"SELECT id, timestamp, actor_user_id, resource_type, resource_id, operation, granted, \
			 reason, reason_code, metadata, request_id, session_id, ip_address, user_agent \
			 FROM permission_audit_logs WHERE {where_clause} \
			 ORDER BY timestamp DESC, rowid DESC LIMIT ? OFFSET ?"
		);
		let mut data_query = sqlx::query(&data_sql);
		for p in &params {
			data_query = data_query.bind(p);
		}
		if let Some(granted) = filter.granted {
			data_query = data_query.bind(granted);
		}
		data_query = data_query.bind(limit).bind(offset);

		let rows = data_query.fetch_all(&self.pool).await?;
		let records = rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()?;

		tracing::debug!(total, returned = records.len(), "audit logs queried");
		Ok((records, total))
	}
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<PermissionAuditRecord, DbError> {
	Ok(PermissionAuditRecord {
		id: row::uuid(row, "id")?,
		timestamp: row::timestamp(row, "timestamp")?,
		actor_user_id: row::opt_uuid(row, "actor_user_id")?.map(UserId::new),
		resource_type: row.try_get("resource_type")?,
		resource_id: row.try_get("resource_id")?,
		operation: row.try_get("operation")?,
		granted: row.try_get("granted")?,
		reason: row.try_get("reason")?,
		reason_code: row.try_get("reason_code")?,
		metadata: row::json(row, "metadata")?,
		request_id: row.try_get("request_id")?,
		session_id: row.try_get("session_id")?,
		ip_address: row.try_get("ip_address")?,
		user_agent: row.try_get("user_agent")?,
	})
}
