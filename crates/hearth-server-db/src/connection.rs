// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::Utc;
use hearth_server_auth::{
	ConnectionRequest, ConnectionRequestId, ConnectionStatus, ConnectionStore, StoreError, UserId,
};
use sqlx::sqlite::SqlitePool;

use crate::error::DbError;
use crate::row;

#[derive(Clone)]
pub struct ConnectionRepository {
	pool: SqlitePool,
}

impl ConnectionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, request), fields(request_id = %request.id))]
	pub async fn create_request(&self, request: &ConnectionRequest) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO connection_requests (id, requester_id, recipient_id, status, created_at, responded_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(request.id.to_string())
		.bind(request.requester_id.to_string())
		.bind(request.recipient_id.to_string())
		.bind(request.status.to_string())
		.bind(request.created_at.to_rfc3339())
		.bind(request.responded_at.map(|t| t.to_rfc3339()))
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Record the answer to a request.
	#[tracing::instrument(skip(self), fields(request_id = %id, status = %status))]
	pub async fn set_status(&self, id: ConnectionRequestId, status: ConnectionStatus) -> Result<(), DbError> {
		let responded_at = (status != ConnectionStatus::Pending).then(|| Utc::now().to_rfc3339());
		let result = sqlx::query("UPDATE connection_requests SET status = ?, responded_at = ? WHERE id = ?")
			.bind(status.to_string())
			.bind(responded_at)
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("connection request {id}")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(a = %a, b = %b))]
	pub async fn requests_between(&self, a: UserId, b: UserId) -> Result<Vec<ConnectionRequest>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, requester_id, recipient_id, status, created_at, responded_at
			FROM connection_requests
			WHERE (requester_id = ?1 AND recipient_id = ?2)
			   OR (requester_id = ?2 AND recipient_id = ?1)
			ORDER BY created_at DESC
			"#,
		)
		.bind(a.to_string())
		.bind(b.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_request).collect()
	}
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<ConnectionRequest, DbError> {
	Ok(ConnectionRequest {
		id: ConnectionRequestId::new(row::uuid(row, "id")?),
		requester_id: UserId::new(row::uuid(row, "requester_id")?),
		recipient_id: UserId::new(row::uuid(row, "recipient_id")?),
		status: row::parsed(row, "status")?,
		created_at: row::timestamp(row, "created_at")?,
		responded_at: row::opt_timestamp(row, "responded_at")?,
	})
}

#[async_trait]
impl ConnectionStore for ConnectionRepository {
	async fn requests_between(&self, a: UserId, b: UserId) -> Result<Vec<ConnectionRequest>, StoreError> {
		Ok(ConnectionRepository::requests_between(self, a, b).await?)
	}
}
