// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User projection and the "reports to" pointer.

use async_trait::async_trait;
use hearth_server_auth::{DivisionId, StoreError, UserDirectory, UserId, UserRecord};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row;

#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert or replace a user's projection.
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
	pub async fn upsert_user(&self, user: &UserRecord) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO users (id, display_name, manager_id, division_id, is_active, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				display_name = excluded.display_name,
				manager_id = excluded.manager_id,
				division_id = excluded.division_id,
				is_active = excluded.is_active
			"#,
		)
		.bind(user.id.to_string())
		.bind(&user.display_name)
		.bind(user.manager_id.map(|m| m.to_string()))
		.bind(user.division_id.map(|d| d.to_string()))
		.bind(user.is_active)
		.bind(user.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %user.id, "user upserted");
		Ok(())
	}

	/// Point `user_id` at a new manager, or clear it.
	///
	/// No cycle check happens here; callers use
	/// `RelationshipResolver::check_for_circular_reference` first.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, manager_id = ?manager_id))]
	pub async fn set_manager(&self, user_id: UserId, manager_id: Option<UserId>) -> Result<(), DbError> {
		let result = sqlx::query("UPDATE users SET manager_id = ? WHERE id = ?")
			.bind(manager_id.map(|m| m.to_string()))
			.bind(user_id.to_string())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {user_id}")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, display_name, manager_id, division_id, is_active, created_at
			FROM users
			WHERE id = ?
			"#,
		)
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_user(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn manager_of(&self, user_id: UserId) -> Result<Option<UserId>, DbError> {
		let row = sqlx::query("SELECT manager_id FROM users WHERE id = ?")
			.bind(user_id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		match row {
			Some(r) => Ok(row::opt_uuid(&r, "manager_id")?.map(UserId::new)),
			None => Ok(None),
		}
	}

	/// Direct reports in a stable order.
	#[tracing::instrument(skip(self), fields(manager_id = %manager_id))]
	pub async fn direct_reports(&self, manager_id: UserId) -> Result<Vec<UserId>, DbError> {
		let rows = sqlx::query("SELECT id FROM users WHERE manager_id = ? ORDER BY created_at, id")
			.bind(manager_id.to_string())
			.fetch_all(&self.pool)
			.await?;

		rows.iter()
			.map(|r| row::uuid(r, "id").map(UserId::new))
			.collect()
	}
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<UserRecord, DbError> {
	Ok(UserRecord {
		id: UserId::new(row::uuid(row, "id")?),
		display_name: row.try_get("display_name")?,
		manager_id: row::opt_uuid(row, "manager_id")?.map(UserId::new),
		division_id: row::opt_uuid(row, "division_id")?.map(DivisionId::new),
		is_active: row.try_get("is_active")?,
		created_at: row::timestamp(row, "created_at")?,
	})
}

#[async_trait]
impl UserDirectory for UserRepository {
	async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
		Ok(UserRepository::get_user(self, user_id).await?)
	}

	async fn manager_of(&self, user_id: UserId) -> Result<Option<UserId>, StoreError> {
		Ok(UserRepository::manager_of(self, user_id).await?)
	}

	async fn direct_reports(&self, manager_id: UserId) -> Result<Vec<UserId>, StoreError> {
		Ok(UserRepository::direct_reports(self, manager_id).await?)
	}
}
