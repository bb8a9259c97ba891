// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Facet definitions, assignments and their history.
//!
//! Assignments are keyed by (facet, entity type, entity id); assigning again
//! refreshes the one row instead of adding another. Revocation only clears
//! `is_active`. History rows are insert-only.

use async_trait::async_trait;
use hearth_server_auth::{
	AssignmentId, EntityRef, FacetAssignment, FacetDefinition, FacetHistoryEntry, FacetId, FacetRef,
	FacetStore, NewAssignment, StoreError, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row;

const DEFINITION_COLUMNS: &str = "d.id AS d_id, d.scope, d.name, d.value, d.description, \
	d.hierarchy_level, d.requires_audit, d.expiry_days, d.requires_review, d.review_days, \
	d.created_at AS d_created_at";

const ASSIGNMENT_COLUMNS: &str = "a.id AS a_id, a.facet_id, a.entity_type, a.entity_id, \
	a.is_active, a.assigned_by, a.assigned_at, a.expires_at, a.review_at, a.reason, a.metadata";

#[derive(Clone)]
pub struct FacetRepository {
	pool: SqlitePool,
}

impl FacetRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Definitions
	// =========================================================================

	/// Add a catalog entry. Fails if (scope, name, value) already exists.
	#[tracing::instrument(skip(self, definition), fields(facet = %definition.facet_ref()))]
	pub async fn create_definition(&self, definition: &FacetDefinition) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO facet_definitions (
				id, scope, name, value, description, hierarchy_level, requires_audit,
				expiry_days, requires_review, review_days, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(definition.id.to_string())
		.bind(&definition.scope)
		.bind(&definition.name)
		.bind(&definition.value)
		.bind(&definition.description)
		.bind(definition.hierarchy_level)
		.bind(definition.requires_audit)
		.bind(definition.expiry_days)
		.bind(definition.requires_review)
		.bind(definition.review_days)
		.bind(definition.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(facet = %definition.facet_ref(), "facet defined");
		Ok(())
	}

	/// All definitions, optionally limited to one scope, ordered by scope then level.
	#[tracing::instrument(skip(self))]
	pub async fn list_definitions(&self, scope: Option<&str>) -> Result<Vec<FacetDefinition>, DbError> {
		let sql = format!(
			"SELECT {DEFINITION_COLUMNS} FROM facet_definitions d \
			 WHERE (?1 IS NULL OR d.scope = ?1) \
			 ORDER BY d.scope, d.hierarchy_level, d.name, d.value"
		);
		let rows = sqlx::query(&sql).bind(scope).fetch_all(&self.pool).await?;
		rows.iter().map(row_to_definition).collect()
	}

	#[tracing::instrument(skip(self), fields(facet = %facet))]
	pub async fn find_definition(&self, facet: &FacetRef) -> Result<Option<FacetDefinition>, DbError> {
		let sql = format!(
			"SELECT {DEFINITION_COLUMNS} FROM facet_definitions d \
			 WHERE d.scope = ? AND d.name = ? AND d.value IS ?"
		);
		let row = sqlx::query(&sql)
			.bind(facet.scope())
			.bind(facet.name())
			.bind(facet.value())
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_definition(&r)).transpose()
	}

	// =========================================================================
	// Assignments
	// =========================================================================

	#[tracing::instrument(skip(self), fields(entity = %entity, scope = ?scope))]
	pub async fn list_active_assignments(
		&self,
		entity: &EntityRef,
		scope: Option<&str>,
	) -> Result<Vec<(FacetDefinition, FacetAssignment)>, DbError> {
		let sql = format!(
			"SELECT {DEFINITION_COLUMNS}, {ASSIGNMENT_COLUMNS} \
			 FROM facet_assignments a \
			 JOIN facet_definitions d ON d.id = a.facet_id \
			 WHERE a.entity_type = ?1 AND a.entity_id = ?2 AND a.is_active = 1 \
			   AND (?3 IS NULL OR d.scope = ?3) \
			 ORDER BY a.assigned_at"
		);
		let rows = sqlx::query(&sql)
			.bind(entity.entity_type.as_str())
			.bind(entity.entity_id.to_string())
			.bind(scope)
			.fetch_all(&self.pool)
			.await?;

		rows.iter()
			.map(|r| Ok((row_to_definition(r)?, row_to_assignment(r)?)))
			.collect()
	}

	#[tracing::instrument(skip(self), fields(facet_id = %facet_id, entity = %entity))]
	pub async fn find_active_assignment(
		&self,
		facet_id: FacetId,
		entity: &EntityRef,
	) -> Result<Option<FacetAssignment>, DbError> {
		let sql = format!(
			"SELECT {ASSIGNMENT_COLUMNS} FROM facet_assignments a \
			 WHERE a.facet_id = ? AND a.entity_type = ? AND a.entity_id = ? AND a.is_active = 1"
		);
		let row = sqlx::query(&sql)
			.bind(facet_id.to_string())
			.bind(entity.entity_type.as_str())
			.bind(entity.entity_id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_assignment(&r)).transpose()
	}

	/// Create the (facet, entity) row or refresh it in place, keeping its id.
	#[tracing::instrument(skip(self, new), fields(facet_id = %new.facet_id, entity = %new.entity))]
	pub async fn upsert_assignment(&self, new: &NewAssignment) -> Result<FacetAssignment, DbError> {
		let metadata = new.metadata.as_ref().map(serde_json::to_string).transpose()?;

		sqlx::query(
			r#"
			INSERT INTO facet_assignments (
				id, facet_id, entity_type, entity_id, is_active, assigned_by,
				assigned_at, expires_at, review_at, reason, metadata
			) VALUES (?, ?, ?, ?, 1, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(facet_id, entity_type, entity_id) DO UPDATE SET
				is_active = 1,
				assigned_by = excluded.assigned_by,
				assigned_at = excluded.assigned_at,
				expires_at = excluded.expires_at,
				review_at = excluded.review_at,
				reason = excluded.reason,
				metadata = excluded.metadata
			"#,
		)
		.bind(AssignmentId::generate().to_string())
		.bind(new.facet_id.to_string())
		.bind(new.entity.entity_type.as_str())
		.bind(new.entity.entity_id.to_string())
		.bind(new.assigned_by.to_string())
		.bind(new.assigned_at.to_rfc3339())
		.bind(new.expires_at.map(|t| t.to_rfc3339()))
		.bind(new.review_at.map(|t| t.to_rfc3339()))
		.bind(&new.reason)
		.bind(metadata)
		.execute(&self.pool)
		.await?;

		self.find_active_assignment(new.facet_id, &new.entity)
			.await?
			.ok_or_else(|| DbError::Internal("assignment vanished after upsert".to_string()))
	}

	#[tracing::instrument(skip(self), fields(facet_id = %facet_id, entity = %entity))]
	pub async fn deactivate_assignments(&self, facet_id: FacetId, entity: &EntityRef) -> Result<u64, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE facet_assignments SET is_active = 0
			WHERE facet_id = ? AND entity_type = ? AND entity_id = ? AND is_active = 1
			"#,
		)
		.bind(facet_id.to_string())
		.bind(entity.entity_type.as_str())
		.bind(entity.entity_id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected())
	}

	// =========================================================================
	// History
	// =========================================================================

	#[tracing::instrument(skip(self, entry), fields(facet_id = %entry.facet_id, action = %entry.action))]
	pub async fn append_history(&self, entry: &FacetHistoryEntry) -> Result<(), DbError> {
		let metadata = entry.metadata.as_ref().map(serde_json::to_string).transpose()?;

		sqlx::query(
			r#"
			INSERT INTO facet_assignment_history (
				id, facet_id, entity_type, entity_id, action, actor_id,
				reason, expires_at, metadata, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(entry.id.to_string())
		.bind(entry.facet_id.to_string())
		.bind(entry.entity.entity_type.as_str())
		.bind(entry.entity.entity_id.to_string())
		.bind(entry.action.to_string())
		.bind(entry.actor_id.to_string())
		.bind(&entry.reason)
		.bind(entry.expires_at.map(|t| t.to_rfc3339()))
		.bind(metadata)
		.bind(entry.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self), fields(entity = %entity, facet_id = ?facet_id))]
	pub async fn list_history(
		&self,
		entity: &EntityRef,
		facet_id: Option<FacetId>,
	) -> Result<Vec<FacetHistoryEntry>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, facet_id, entity_type, entity_id, action, actor_id,
			       reason, expires_at, metadata, created_at
			FROM facet_assignment_history
			WHERE entity_type = ?1 AND entity_id = ?2 AND (?3 IS NULL OR facet_id = ?3)
			ORDER BY created_at, rowid
			"#,
		)
		.bind(entity.entity_type.as_str())
		.bind(entity.entity_id.to_string())
		.bind(facet_id.map(|f| f.to_string()))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_history).collect()
	}
}

fn row_to_definition(row: &sqlx::sqlite::SqliteRow) -> Result<FacetDefinition, DbError> {
	Ok(FacetDefinition {
		id: FacetId::new(row::uuid(row, "d_id")?),
		scope: row.try_get("scope")?,
		name: row.try_get("name")?,
		value: row.try_get("value")?,
		description: row.try_get("description")?,
		hierarchy_level: row.try_get("hierarchy_level")?,
		requires_audit: row.try_get("requires_audit")?,
		expiry_days: row.try_get("expiry_days")?,
		requires_review: row.try_get("requires_review")?,
		review_days: row.try_get("review_days")?,
		created_at: row::timestamp(row, "d_created_at")?,
	})
}

fn row_to_assignment(row: &sqlx::sqlite::SqliteRow) -> Result<FacetAssignment, DbError> {
	Ok(FacetAssignment {
		id: AssignmentId::new(row::uuid(row, "a_id")?),
		facet_id: FacetId::new(row::uuid(row, "facet_id")?),
		entity: row::entity(row)?,
		is_active: row.try_get("is_active")?,
		assigned_by: row::opt_uuid(row, "assigned_by")?.map(UserId::new),
		assigned_at: row::timestamp(row, "assigned_at")?,
		expires_at: row::opt_timestamp(row, "expires_at")?,
		review_at: row::opt_timestamp(row, "review_at")?,
		reason: row.try_get("reason")?,
		metadata: row::json(row, "metadata")?,
	})
}

fn row_to_history(row: &sqlx::sqlite::SqliteRow) -> Result<FacetHistoryEntry, DbError> {
	Ok(FacetHistoryEntry {
		id: row::uuid(row, "id")?,
		facet_id: FacetId::new(row::uuid(row, "facet_id")?),
		entity: row::entity(row)?,
		action: row::parsed(row, "action")?,
		actor_id: UserId::new(row::uuid(row, "actor_id")?),
		reason: row.try_get("reason")?,
		expires_at: row::opt_timestamp(row, "expires_at")?,
		metadata: row::json(row, "metadata")?,
		created_at: row::timestamp(row, "created_at")?,
	})
}

#[async_trait]
impl FacetStore for FacetRepository {
	async fn find_definition(&self, facet: &FacetRef) -> Result<Option<FacetDefinition>, StoreError> {
		Ok(FacetRepository::find_definition(self, facet).await?)
	}

	async fn list_active_assignments(
		&self,
		entity: &EntityRef,
		scope: Option<&str>,
	) -> Result<Vec<(FacetDefinition, FacetAssignment)>, StoreError> {
		Ok(FacetRepository::list_active_assignments(self, entity, scope).await?)
	}

	async fn find_active_assignment(
		&self,
		facet_id: FacetId,
		entity: &EntityRef,
	) -> Result<Option<FacetAssignment>, StoreError> {
		Ok(FacetRepository::find_active_assignment(self, facet_id, entity).await?)
	}

	async fn upsert_assignment(&self, assignment: &NewAssignment) -> Result<FacetAssignment, StoreError> {
		Ok(FacetRepository::upsert_assignment(self, assignment).await?)
	}

	async fn deactivate_assignments(&self, facet_id: FacetId, entity: &EntityRef) -> Result<u64, StoreError> {
		Ok(FacetRepository::deactivate_assignments(self, facet_id, entity).await?)
	}

	async fn append_history(&self, entry: &FacetHistoryEntry) -> Result<(), StoreError> {
		Ok(FacetRepository::append_history(self, entry).await?)
	}

	async fn list_history(
		&self,
		entity: &EntityRef,
		facet_id: Option<FacetId>,
	) -> Result<Vec<FacetHistoryEntry>, StoreError> {
		Ok(FacetRepository::list_history(self, entity, facet_id).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use chrono::{Duration, Utc};
	use hearth_server_auth::facet::known;
	use serde_json::json;

	async fn repo() -> FacetRepository {
		FacetRepository::new(create_test_pool().await.unwrap())
	}

	fn new_assignment(facet_id: FacetId, entity: EntityRef, reason: &str) -> NewAssignment {
		NewAssignment {
			facet_id,
			entity,
			assigned_by: UserId::generate(),
			assigned_at: Utc::now(),
			expires_at: Some(Utc::now() + Duration::days(30)),
			review_at: None,
			reason: Some(reason.to_string()),
			metadata: Some(json!({ "ticket": 7 })),
		}
	}

	#[tokio::test]
	async fn definitions_match_exact_value() {
		let repo = repo().await;
		let gold = FacetDefinition::new(&known::creator_tier("gold")).with_level(3);
		let valueless = FacetDefinition::new(&FacetRef::new("creator", "tier"));
		repo.create_definition(&gold).await.unwrap();
		repo.create_definition(&valueless).await.unwrap();

		let found = repo.find_definition(&known::creator_tier("gold")).await.unwrap().unwrap();
		assert_eq!(found.id, gold.id);
		assert_eq!(found.hierarchy_level, 3);

		let found = repo
			.find_definition(&FacetRef::new("creator", "tier"))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(found.id, valueless.id);

		assert!(repo.find_definition(&known::creator_tier("silver")).await.unwrap().is_none());
		assert!(repo.create_definition(&FacetDefinition::new(&known::creator_tier("gold"))).await.is_err());

		assert_eq!(repo.list_definitions(Some("creator")).await.unwrap().len(), 2);
		assert!(repo.list_definitions(Some("role")).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn upsert_keeps_a_single_row() {
		let repo = repo().await;
		let support = FacetDefinition::new(&known::support());
		repo.create_definition(&support).await.unwrap();
		let entity = EntityRef::user(UserId::generate());

		let first = repo
			.upsert_assignment(&new_assignment(support.id, entity, "first"))
			.await
			.unwrap();
		assert_eq!(repo.deactivate_assignments(support.id, &entity).await.unwrap(), 1);
		assert!(repo.find_active_assignment(support.id, &entity).await.unwrap().is_none());

		let second = repo
			.upsert_assignment(&new_assignment(support.id, entity, "second"))
			.await
			.unwrap();
		assert_eq!(second.id, first.id);
		assert!(second.is_active);
		assert_eq!(second.reason.as_deref(), Some("second"));
		assert_eq!(second.metadata, Some(json!({ "ticket": 7 })));

		let listed = repo.list_active_assignments(&entity, None).await.unwrap();
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].0.id, support.id);

		let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM facet_assignments")
			.fetch_one(&repo.pool)
			.await
			.unwrap()
			.get("n");
		assert_eq!(count, 1);
	}

	#[tokio::test]
	async fn scope_filter_and_history_order() {
		let repo = repo().await;
		let support = FacetDefinition::new(&known::support());
		let gold = FacetDefinition::new(&known::creator_tier("gold"));
		repo.create_definition(&support).await.unwrap();
		repo.create_definition(&gold).await.unwrap();
		let entity = EntityRef::user(UserId::generate());

		for def in [&support, &gold] {
			let new = new_assignment(def.id, entity, "grant");
			repo.upsert_assignment(&new).await.unwrap();
			repo.append_history(&FacetHistoryEntry::assigned(&new)).await.unwrap();
		}
		repo.append_history(&FacetHistoryEntry::revoked(
			support.id,
			entity,
			UserId::generate(),
			Some("done".to_string()),
		))
		.await
		.unwrap();

		let roles = repo.list_active_assignments(&entity, Some("role")).await.unwrap();
		assert_eq!(roles.len(), 1);
		assert_eq!(roles[0].0.name, "support");

		let history = repo.list_history(&entity, None).await.unwrap();
		assert_eq!(history.len(), 3);
		let support_history = repo.list_history(&entity, Some(support.id)).await.unwrap();
		assert_eq!(support_history.len(), 2);
		assert_eq!(support_history[1].reason.as_deref(), Some("done"));
	}
}
