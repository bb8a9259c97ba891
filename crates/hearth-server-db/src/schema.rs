// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema bootstrap. Every statement is idempotent.
//!
//! Timestamps are RFC3339 TEXT and identifiers are UUID strings.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const STATEMENTS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS users (
		id TEXT PRIMARY KEY,
		display_name TEXT NOT NULL,
		manager_id TEXT,
		division_id TEXT,
		is_active INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_users_manager_id ON users(manager_id)",
	r#"
	CREATE TABLE IF NOT EXISTS connection_requests (
		id TEXT PRIMARY KEY,
		requester_id TEXT NOT NULL,
		recipient_id TEXT NOT NULL,
		status TEXT NOT NULL CHECK (status IN ('pending', 'accepted', 'rejected', 'cancelled')),
		created_at TEXT NOT NULL,
		responded_at TEXT
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_connection_requests_pair ON connection_requests(requester_id, recipient_id)",
	r#"
	CREATE TABLE IF NOT EXISTS communities (
		id TEXT PRIMARY KEY,
		name TEXT NOT NULL,
		owner_id TEXT NOT NULL,
		visibility TEXT NOT NULL DEFAULT 'public' CHECK (visibility IN ('public', 'private')),
		join_policy TEXT NOT NULL DEFAULT 'open' CHECK (join_policy IN ('open', 'approval')),
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS community_memberships (
		community_id TEXT NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
		user_id TEXT NOT NULL,
		role TEXT NOT NULL,
		status TEXT NOT NULL,
		joined_at TEXT NOT NULL,
		PRIMARY KEY (community_id, user_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS facet_definitions (
		id TEXT PRIMARY KEY,
		scope TEXT NOT NULL,
		name TEXT NOT NULL,
		value TEXT,
		description TEXT,
		hierarchy_level INTEGER NOT NULL DEFAULT 0,
		requires_audit INTEGER NOT NULL DEFAULT 0,
		expiry_days INTEGER,
		requires_review INTEGER NOT NULL DEFAULT 0,
		review_days INTEGER,
		created_at TEXT NOT NULL
	)
	"#,
	"CREATE UNIQUE INDEX IF NOT EXISTS idx_facet_definitions_identity ON facet_definitions(scope, name, COALESCE(value, ''))",
	r#"
	CREATE TABLE IF NOT EXISTS facet_assignments (
		id TEXT PRIMARY KEY,
		facet_id TEXT NOT NULL REFERENCES facet_definitions(id),
		entity_type TEXT NOT NULL,
		entity_id TEXT NOT NULL,
		is_active INTEGER NOT NULL DEFAULT 1,
		assigned_by TEXT,
		assigned_at TEXT NOT NULL,
		expires_at TEXT,
		review_at TEXT,
		reason TEXT,
		metadata TEXT,
		UNIQUE (facet_id, entity_type, entity_id)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_facet_assignments_entity ON facet_assignments(entity_type, entity_id)",
	r#"
	CREATE TABLE IF NOT EXISTS facet_assignment_history (
		id TEXT PRIMARY KEY,
		facet_id TEXT NOT NULL REFERENCES facet_definitions(id),
		entity_type TEXT NOT NULL,
		entity_id TEXT NOT NULL,
		action TEXT NOT NULL CHECK (action IN ('ASSIGNED', 'REVOKED')),
		actor_id TEXT NOT NULL,
		reason TEXT,
		expires_at TEXT,
		metadata TEXT,
		created_at TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_facet_history_entity ON facet_assignment_history(entity_type, entity_id)",
	r#"
	CREATE TABLE IF NOT EXISTS permission_audit_logs (
		id TEXT PRIMARY KEY,
		timestamp TEXT NOT NULL,
		actor_user_id TEXT,
		resource_type TEXT NOT NULL,
		resource_id TEXT,
		operation TEXT NOT NULL,
		granted INTEGER NOT NULL,
		reason TEXT NOT NULL,
		reason_code TEXT NOT NULL,
		metadata TEXT,
		request_id TEXT,
		session_id TEXT,
		ip_address TEXT,
		user_agent TEXT,
		created_at TEXT NOT NULL
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_permission_audit_logs_actor ON permission_audit_logs(actor_user_id)",
	"CREATE INDEX IF NOT EXISTS idx_permission_audit_logs_resource ON permission_audit_logs(resource_type, resource_id)",
];

/// Create every table and index the repositories use.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	let mut tx = pool.begin().await?;
	for statement in STATEMENTS {
		sqlx::query(statement).execute(&mut *tx).await?;
	}
	tx.commit().await?;

	tracing::info!(statements = STATEMENTS.len(), "schema ready");
	Ok(())
}
