// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Narrow interfaces onto externally owned data.
//!
//! The authorization core never talks to a storage engine directly. Each trait
//! here is the minimum it needs; `hearth-server-db` implements them over SQLite.

use async_trait::async_trait;

use crate::community::{Community, CommunityMembership};
use crate::connection::ConnectionRequest;
use crate::error::StoreError;
use crate::facet::{FacetAssignment, FacetDefinition, FacetHistoryEntry, FacetRef, NewAssignment};
use crate::types::{CommunityId, EntityRef, FacetId, UserId};
use crate::user::UserRecord;

/// Durable storage for facet definitions, assignments and history.
#[async_trait]
pub trait FacetStore: Send + Sync {
	/// The definition with exactly this scope, name and value.
	async fn find_definition(&self, facet: &FacetRef) -> Result<Option<FacetDefinition>, StoreError>;

	/// All rows with `is_active` set for the entity, optionally limited to one scope.
	///
	/// Expiry is not filtered here; callers evaluate it against the current time.
	async fn list_active_assignments(
		&self,
		entity: &EntityRef,
		scope: Option<&str>,
	) -> Result<Vec<(FacetDefinition, FacetAssignment)>, StoreError>;

	async fn find_active_assignment(
		&self,
		facet_id: FacetId,
		entity: &EntityRef,
	) -> Result<Option<FacetAssignment>, StoreError>;

	/// Insert or refresh the single row for (facet, entity), leaving it active.
	async fn upsert_assignment(&self, assignment: &NewAssignment) -> Result<FacetAssignment, StoreError>;

	/// Deactivate every active row for (facet, entity). Returns the number of rows changed.
	async fn deactivate_assignments(&self, facet_id: FacetId, entity: &EntityRef) -> Result<u64, StoreError>;

	async fn append_history(&self, entry: &FacetHistoryEntry) -> Result<(), StoreError>;

	/// History for an entity, oldest first.
	async fn list_history(
		&self,
		entity: &EntityRef,
		facet_id: Option<FacetId>,
	) -> Result<Vec<FacetHistoryEntry>, StoreError>;
}

/// Read access to users and the "reports to" pointer.
#[async_trait]
pub trait UserDirectory: Send + Sync {
	async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError>;

	/// The user's manager, if any.
	async fn manager_of(&self, user_id: UserId) -> Result<Option<UserId>, StoreError>;

	/// Users whose manager is `manager_id`.
	async fn direct_reports(&self, manager_id: UserId) -> Result<Vec<UserId>, StoreError>;
}

/// Read access to connection requests.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
	/// Every request between `a` and `b`, in either direction, newest first.
	async fn requests_between(&self, a: UserId, b: UserId) -> Result<Vec<ConnectionRequest>, StoreError>;
}

/// Read access to communities and memberships.
#[async_trait]
pub trait CommunityStore: Send + Sync {
	async fn get_community(&self, community_id: CommunityId) -> Result<Option<Community>, StoreError>;

	async fn membership(
		&self,
		community_id: CommunityId,
		user_id: UserId,
	) -> Result<Option<CommunityMembership>, StoreError>;
}
