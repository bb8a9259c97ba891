// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite storage for Hearth authorization.
//!
//! Each repository implements one of the read interfaces from
//! `hearth-server-auth` and adds the writes operators and tests need.

pub mod audit;
pub mod community;
pub mod connection;
pub mod error;
pub mod facet;
pub mod pool;
mod row;
pub mod schema;
pub mod testing;
pub mod user;

pub use audit::{AuditQuery, AuditRepository};
pub use community::CommunityRepository;
pub use connection::ConnectionRepository;
pub use error::{DbError, Result};
pub use facet::FacetRepository;
pub use pool::create_pool;
pub use schema::run_migrations;
pub use user::UserRepository;

use std::sync::Arc;

use hearth_server_auth::{DecisionEngine, FacetCatalog, RelationshipResolver};
use sqlx::sqlite::SqlitePool;

/// A decision engine whose stores all read from `pool`.
pub fn decision_engine(pool: &SqlitePool) -> DecisionEngine {
	let facets = FacetCatalog::new(Arc::new(FacetRepository::new(pool.clone())));
	let relationships = RelationshipResolver::new(
		Arc::new(UserRepository::new(pool.clone())),
		Arc::new(ConnectionRepository::new(pool.clone())),
	);
	DecisionEngine::new(
		facets,
		relationships,
		Arc::new(CommunityRepository::new(pool.clone())),
	)
}
