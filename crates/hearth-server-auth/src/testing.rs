// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory store implementations for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::community::{Community, CommunityMembership};
use crate::connection::ConnectionRequest;
use crate::error::StoreError;
use crate::facet::{
	FacetAssignment, FacetCatalog, FacetDefinition, FacetHistoryEntry, FacetRef, NewAssignment,
};
use crate::relationship::RelationshipResolver;
use crate::store::{CommunityStore, ConnectionStore, FacetStore, UserDirectory};
use crate::types::{AssignmentId, CommunityId, EntityRef, FacetId, UserId};
use crate::user::UserRecord;
use crate::DecisionEngine;

fn unavailable() -> StoreError {
	StoreError::Unavailable("simulated outage".to_string())
}

#[derive(Default)]
pub struct MemoryFacetStore {
	definitions: RwLock<Vec<FacetDefinition>>,
	assignments: RwLock<Vec<FacetAssignment>>,
	history: RwLock<Vec<FacetHistoryEntry>>,
	failing: AtomicBool,
}

impl MemoryFacetStore {
	pub fn define(&self, definition: FacetDefinition) -> FacetDefinition {
		self.definitions.write().unwrap().push(definition.clone());
		definition
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn assignment_rows(&self) -> Vec<FacetAssignment> {
		self.assignments.read().unwrap().clone()
	}

	fn check(&self) -> Result<(), StoreError> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(unavailable());
		}
		Ok(())
	}
}

#[async_trait]
impl FacetStore for MemoryFacetStore {
	async fn find_definition(&self, facet: &FacetRef) -> Result<Option<FacetDefinition>, StoreError> {
		self.check()?;
		Ok(self
			.definitions
			.read()
			.unwrap()
			.iter()
			.find(|d| facet.identifies(d))
			.cloned())
	}

	async fn list_active_assignments(
		&self,
		entity: &EntityRef,
		scope: Option<&str>,
	) -> Result<Vec<(FacetDefinition, FacetAssignment)>, StoreError> {
		self.check()?;
		let definitions = self.definitions.read().unwrap();
		let assignments = self.assignments.read().unwrap();
		Ok(assignments
			.iter()
			.filter(|a| a.is_active && a.entity == *entity)
			.filter_map(|a| {
				let def = definitions.iter().find(|d| d.id == a.facet_id)?;
				match scope {
					Some(s) if def.scope != s => None,
					_ => Some((def.clone(), a.clone())),
				}
			})
			.collect())
	}

	async fn find_active_assignment(
		&self,
		facet_id: FacetId,
		entity: &EntityRef,
	) -> Result<Option<FacetAssignment>, StoreError> {
		self.check()?;
		Ok(self
			.assignments
			.read()
			.unwrap()
			.iter()
			.find(|a| a.is_active && a.facet_id == facet_id && a.entity == *entity)
			.cloned())
	}

	async fn upsert_assignment(&self, new: &NewAssignment) -> Result<FacetAssignment, StoreError> {
		self.check()?;
		let mut assignments = self.assignments.write().unwrap();
		let row = FacetAssignment {
			id: AssignmentId::generate(),
			facet_id: new.facet_id,
			entity: new.entity,
			is_active: true,
			assigned_by: Some(new.assigned_by),
			assigned_at: new.assigned_at,
			expires_at: new.expires_at,
			review_at: new.review_at,
			reason: new.reason.clone(),
			metadata: new.metadata.clone(),
		};
		match assignments
			.iter_mut()
			.find(|a| a.facet_id == new.facet_id && a.entity == new.entity)
		{
			Some(existing) => {
				let id = existing.id;
				*existing = FacetAssignment { id, ..row };
				Ok(existing.clone())
			}
			None => {
				assignments.push(row.clone());
				Ok(row)
			}
		}
	}

	async fn deactivate_assignments(&self, facet_id: FacetId, entity: &EntityRef) -> Result<u64, StoreError> {
		self.check()?;
		let mut changed = 0;
		for a in self.assignments.write().unwrap().iter_mut() {
			if a.is_active && a.facet_id == facet_id && a.entity == *entity {
				a.is_active = false;
				changed += 1;
			}
		}
		Ok(changed)
	}

	async fn append_history(&self, entry: &FacetHistoryEntry) -> Result<(), StoreError> {
		self.check()?;
		self.history.write().unwrap().push(entry.clone());
		Ok(())
	}

	async fn list_history(
		&self,
		entity: &EntityRef,
		facet_id: Option<FacetId>,
	) -> Result<Vec<FacetHistoryEntry>, StoreError> {
		self.check()?;
		Ok(self
			.history
			.read()
			.unwrap()
			.iter()
			.filter(|h| h.entity == *entity && facet_id.map_or(true, |f| h.facet_id == f))
			.cloned()
			.collect())
	}
}

#[derive(Default)]
pub struct MemoryUserDirectory {
	users: RwLock<HashMap<UserId, UserRecord>>,
	lookups: std::sync::atomic::AtomicUsize,
}

impl MemoryUserDirectory {
	pub fn insert(&self, user: UserRecord) -> UserRecord {
		self.users.write().unwrap().insert(user.id, user.clone());
		user
	}

	/// Point `user_id` at `manager_id`, creating either record if missing.
	pub fn set_manager(&self, user_id: UserId, manager_id: UserId) {
		let mut users = self.users.write().unwrap();
		users
			.entry(manager_id)
			.or_insert_with(|| UserRecord::new(manager_id, "manager"));
		users
			.entry(user_id)
			.or_insert_with(|| UserRecord::new(user_id, "user"))
			.manager_id = Some(manager_id);
	}

	pub fn manager_lookups(&self) -> usize {
		self.lookups.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
	async fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
		Ok(self.users.read().unwrap().get(&user_id).cloned())
	}

	async fn manager_of(&self, user_id: UserId) -> Result<Option<UserId>, StoreError> {
		self.lookups.fetch_add(1, Ordering::SeqCst);
		Ok(self
			.users
			.read()
			.unwrap()
			.get(&user_id)
			.and_then(|u| u.manager_id))
	}

	async fn direct_reports(&self, manager_id: UserId) -> Result<Vec<UserId>, StoreError> {
		let mut reports: Vec<UserId> = self
			.users
			.read()
			.unwrap()
			.values()
			.filter(|u| u.manager_id == Some(manager_id))
			.map(|u| u.id)
			.collect();
		reports.sort();
		Ok(reports)
	}
}

#[derive(Default)]
pub struct MemoryConnectionStore {
	requests: RwLock<Vec<ConnectionRequest>>,
}

impl MemoryConnectionStore {
	pub fn insert(&self, request: ConnectionRequest) -> ConnectionRequest {
		self.requests.write().unwrap().push(request.clone());
		request
	}
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
	async fn requests_between(&self, a: UserId, b: UserId) -> Result<Vec<ConnectionRequest>, StoreError> {
		let mut found: Vec<ConnectionRequest> = self
			.requests
			.read()
			.unwrap()
			.iter()
			.filter(|r| r.connects(a, b))
			.cloned()
			.collect();
		found.sort_by(|x, y| y.created_at.cmp(&x.created_at));
		Ok(found)
	}
}

#[derive(Default)]
pub struct MemoryCommunityStore {
	communities: RwLock<HashMap<CommunityId, Community>>,
	memberships: RwLock<Vec<CommunityMembership>>,
}

impl MemoryCommunityStore {
	pub fn insert(&self, community: Community) -> Community {
		self.communities
			.write()
			.unwrap()
			.insert(community.id, community.clone());
		community
	}

	pub fn add_membership(&self, membership: CommunityMembership) {
		let mut memberships = self.memberships.write().unwrap();
		memberships.retain(|m| {
			!(m.community_id == membership.community_id && m.user_id == membership.user_id)
		});
		memberships.push(membership);
	}
}

#[async_trait]
impl CommunityStore for MemoryCommunityStore {
	async fn get_community(&self, community_id: CommunityId) -> Result<Option<Community>, StoreError> {
		Ok(self.communities.read().unwrap().get(&community_id).cloned())
	}

	async fn membership(
		&self,
		community_id: CommunityId,
		user_id: UserId,
	) -> Result<Option<CommunityMembership>, StoreError> {
		Ok(self
			.memberships
			.read()
			.unwrap()
			.iter()
			.find(|m| m.community_id == community_id && m.user_id == user_id)
			.cloned())
	}
}

/// All four in-memory stores wired into a [`DecisionEngine`].
pub struct TestHarness {
	pub facets: Arc<MemoryFacetStore>,
	pub users: Arc<MemoryUserDirectory>,
	pub connections: Arc<MemoryConnectionStore>,
	pub communities: Arc<MemoryCommunityStore>,
	pub engine: DecisionEngine,
}

impl TestHarness {
	pub fn new() -> Self {
		let facets = Arc::new(MemoryFacetStore::default());
		let users = Arc::new(MemoryUserDirectory::default());
		let connections = Arc::new(MemoryConnectionStore::default());
		let communities = Arc::new(MemoryCommunityStore::default());

		let engine = DecisionEngine::new(
			FacetCatalog::new(facets.clone()),
			RelationshipResolver::new(users.clone(), connections.clone()),
			communities.clone(),
		);

		Self {
			facets,
			users,
			connections,
			communities,
			engine,
		}
	}

	/// Register a user and return an authenticated context for them.
	pub fn user(&self, name: &str) -> crate::AuthenticationContext {
		let user = self.users.insert(UserRecord::new(UserId::generate(), name));
		crate::AuthenticationContext::authenticated(user)
	}

	/// Define `facet` (if needed) and assign it to `user_id`.
	pub async fn grant_facet(&self, user_id: UserId, facet: FacetRef) {
		if self.facets.find_definition(&facet).await.unwrap().is_none() {
			self.facets.define(FacetDefinition::new(&facet));
		}
		self.engine
			.facets()
			.assign(
				&facet,
				&EntityRef::user(user_id),
				user_id,
				crate::facet::AssignOptions::default(),
			)
			.await
			.unwrap();
	}

	pub fn befriend(&self, a: UserId, b: UserId) {
		self.connections.insert(
			ConnectionRequest::new(a, b).with_status(crate::types::ConnectionStatus::Accepted),
		);
	}
}
