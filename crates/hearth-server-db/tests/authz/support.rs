// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use hearth_server_auth::{
	facet::known, AssignOptions, AuthenticationContext, ConnectionRequest, ConnectionStatus,
	DecisionEngine, EntityRef, FacetDefinition, FacetRef, UserId, UserRecord,
};
use hearth_server_db::{
	decision_engine, testing::create_test_pool, ConnectionRepository, FacetRepository, UserRepository,
};
use sqlx::sqlite::SqlitePool;

pub struct Harness {
	pub pool: SqlitePool,
	pub engine: DecisionEngine,
	pub facets: FacetRepository,
	pub users: UserRepository,
	pub connections: ConnectionRepository,
	/// Actor recorded on setup assignments.
	pub system: UserId,
}

impl Harness {
	pub async fn new() -> Self {
		let pool = create_test_pool().await.unwrap();
		let harness = Self {
			engine: decision_engine(&pool),
			facets: FacetRepository::new(pool.clone()),
			users: UserRepository::new(pool.clone()),
			connections: ConnectionRepository::new(pool.clone()),
			system: UserId::generate(),
			pool,
		};
		for facet in [
			known::global_admin(),
			known::content_moderator(),
			known::support(),
			known::posting_suspended(),
		] {
			harness.define(FacetDefinition::new(&facet).with_audit()).await;
		}
		harness
	}

	pub async fn define(&self, definition: FacetDefinition) -> FacetDefinition {
		self.facets.create_definition(&definition).await.unwrap();
		definition
	}

	pub async fn insert_user(&self, record: UserRecord) -> UserRecord {
		self.users.upsert_user(&record).await.unwrap();
		record
	}

	/// A stored user and a context authenticated as them.
	pub async fn user(&self, name: &str) -> (UserId, AuthenticationContext) {
		let record = self.insert_user(UserRecord::new(UserId::generate(), name)).await;
		(record.id, AuthenticationContext::authenticated(record))
	}

	pub async fn grant(&self, user_id: UserId, facet: &FacetRef) {
		self.engine
			.facets()
			.assign(facet, &EntityRef::user(user_id), self.system, AssignOptions::default())
			.await
			.unwrap();
	}

	pub async fn befriend(&self, a: UserId, b: UserId) {
		let request = ConnectionRequest::new(a, b).with_status(ConnectionStatus::Accepted);
		self.connections.create_request(&request).await.unwrap();
	}
}
