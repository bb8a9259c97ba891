// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use hearth_server_auth::{
	Community, CommunityId, CommunityMembership, CommunityStore, CommunityVisibility, JoinPolicy,
	StoreError, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row;

#[derive(Clone)]
pub struct CommunityRepository {
	pool: SqlitePool,
}

impl CommunityRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, community), fields(community_id = %community.id))]
	pub async fn create_community(&self, community: &Community) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO communities (id, name, owner_id, visibility, join_policy, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(community.id.to_string())
		.bind(&community.name)
		.bind(community.owner_id.to_string())
		.bind(visibility_str(community.visibility))
		.bind(join_policy_str(community.join_policy))
		.bind(community.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(community_id = %community.id, "community created");
		Ok(())
	}

	/// Insert or replace the membership row for (community, user).
	#[tracing::instrument(
		skip(self, membership),
		fields(community_id = %membership.community_id, user_id = %membership.user_id, role = %membership.role)
	)]
	pub async fn upsert_membership(&self, membership: &CommunityMembership) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO community_memberships (community_id, user_id, role, status, joined_at)
			VALUES (?, ?, ?, ?, ?)
			ON CONFLICT(community_id, user_id) DO UPDATE SET
				role = excluded.role,
				status = excluded.status
			"#,
		)
		.bind(membership.community_id.to_string())
		.bind(membership.user_id.to_string())
		.bind(membership.role.to_string())
		.bind(membership.status.to_string())
		.bind(membership.joined_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self), fields(community_id = %community_id))]
	pub async fn get_community(&self, community_id: CommunityId) -> Result<Option<Community>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, owner_id, visibility, join_policy, created_at
			FROM communities
			WHERE id = ?
			"#,
		)
		.bind(community_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_community(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(community_id = %community_id, user_id = %user_id))]
	pub async fn membership(
		&self,
		community_id: CommunityId,
		user_id: UserId,
	) -> Result<Option<CommunityMembership>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT community_id, user_id, role, status, joined_at
			FROM community_memberships
			WHERE community_id = ? AND user_id = ?
			"#,
		)
		.bind(community_id.to_string())
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_membership(&r)).transpose()
	}
}

fn visibility_str(visibility: CommunityVisibility) -> &'static str {
	match visibility {
		CommunityVisibility::Public => "public",
		CommunityVisibility::Private => "private",
	}
}

fn join_policy_str(policy: JoinPolicy) -> &'static str {
	match policy {
		JoinPolicy::Open => "open",
		JoinPolicy::Approval => "approval",
	}
}

fn row_to_community(row: &sqlx::sqlite::SqliteRow) -> Result<Community, DbError> {
	let visibility: String = row.try_get("visibility")?;
	let join_policy: String = row.try_get("join_policy")?;

	Ok(Community {
		id: CommunityId::new(row::uuid(row, "id")?),
		name: row.try_get("name")?,
		owner_id: UserId::new(row::uuid(row, "owner_id")?),
		visibility: match visibility.as_str() {
			"public" => CommunityVisibility::Public,
			"private" => CommunityVisibility::Private,
			other => return Err(DbError::Internal(format!("Invalid visibility: {other}"))),
		},
		join_policy: match join_policy.as_str() {
			"open" => JoinPolicy::Open,
			"approval" => JoinPolicy::Approval,
			other => return Err(DbError::Internal(format!("Invalid join_policy: {other}"))),
		},
		created_at: row::timestamp(row, "created_at")?,
	})
}

fn row_to_membership(row: &sqlx::sqlite::SqliteRow) -> Result<CommunityMembership, DbError> {
	Ok(CommunityMembership {
		community_id: CommunityId::new(row::uuid(row, "community_id")?),
		user_id: UserId::new(row::uuid(row, "user_id")?),
		role: row::parsed(row, "role")?,
		status: row::parsed(row, "status")?,
		joined_at: row::timestamp(row, "joined_at")?,
	})
}

#[async_trait]
impl CommunityStore for CommunityRepository {
	async fn get_community(&self, community_id: CommunityId) -> Result<Option<Community>, StoreError> {
		Ok(CommunityRepository::get_community(self, community_id).await?)
	}

	async fn membership(
		&self,
		community_id: CommunityId,
		user_id: UserId,
	) -> Result<Option<CommunityMembership>, StoreError> {
		Ok(CommunityRepository::membership(self, community_id, user_id).await?)
	}
}
