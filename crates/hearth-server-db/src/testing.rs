// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helpers for tests that need a real database.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::DbError;
use crate::schema::run_migrations;

/// A migrated in-memory database.
///
/// Limited to one connection: every new `:memory:` connection would see its
/// own empty database.
pub async fn create_test_pool() -> Result<SqlitePool, DbError> {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None)
		.connect("sqlite::memory:")
		.await?;
	run_migrations(&pool).await?;
	Ok(pool)
}
