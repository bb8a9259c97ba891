// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Facet queries and assignment administration.
//!
//! Every read evaluates effectiveness against `Utc::now()` at call time: an
//! assignment stops counting the instant it expires, with no sweep required.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
	AssignOptions, FacetAssignment, FacetHistoryEntry, FacetRef, FacetWithAssignment, NewAssignment,
};
use crate::error::{AuthError, AuthResult};
use crate::store::FacetStore;
use crate::types::{EntityRef, UserId};

/// Facet catalog and assignment service over a [`FacetStore`].
#[derive(Clone)]
pub struct FacetCatalog {
	store: Arc<dyn FacetStore>,
}

impl FacetCatalog {
	pub fn new(store: Arc<dyn FacetStore>) -> Self {
		Self { store }
	}

	/// Returns true iff the entity has an effective assignment matching `facet`.
	#[instrument(level = "debug", skip(self), fields(entity = %entity, facet = %facet))]
	pub async fn has_facet(&self, entity: &EntityRef, facet: &FacetRef) -> AuthResult<bool> {
		let now = Utc::now();
		let rows = self
			.store
			.list_active_assignments(entity, Some(facet.scope()))
			.await?;

		Ok(rows
			.iter()
			.any(|(definition, assignment)| facet.matches(definition) && assignment.is_effective_at(now)))
	}

	/// All effective assignments for the entity, optionally limited to one scope.
	#[instrument(level = "debug", skip(self), fields(entity = %entity))]
	pub async fn get_facets(
		&self,
		entity: &EntityRef,
		scope: Option<&str>,
	) -> AuthResult<Vec<FacetWithAssignment>> {
		let now = Utc::now();
		let rows = self.store.list_active_assignments(entity, scope).await?;

		Ok(rows
			.into_iter()
			.filter(|(_, assignment)| assignment.is_effective_at(now))
			.map(|(definition, assignment)| FacetWithAssignment {
				is_expired: assignment.is_expired_at(now),
				needs_review: assignment.needs_review_at(now),
				definition,
				assignment,
			})
			.collect())
	}

	/// Resolves a single-valued facet.
	///
	/// Returns the stored value, or the facet name for value-less (boolean-like)
	/// facets. When several values are effective, the most recently assigned wins.
	#[instrument(level = "debug", skip(self), fields(entity = %entity))]
	pub async fn get_facet_value(
		&self,
		entity: &EntityRef,
		scope: &str,
		name: &str,
	) -> AuthResult<Option<String>> {
		let facets = self.get_facets(entity, Some(scope)).await?;

		Ok(facets
			.into_iter()
			.filter(|f| f.definition.name == name)
			.max_by_key(|f| f.assignment.assigned_at)
			.map(|f| f.definition.effective_value().to_string()))
	}

	/// Returns true iff some effective assignment in `scope` has a definition at
	/// `minimum_level` or above.
	#[instrument(level = "debug", skip(self), fields(entity = %entity))]
	pub async fn has_facet_at_level(
		&self,
		entity: &EntityRef,
		scope: &str,
		minimum_level: i32,
	) -> AuthResult<bool> {
		let facets = self.get_facets(entity, Some(scope)).await?;
		Ok(facets
			.iter()
			.any(|f| f.definition.hierarchy_level >= minimum_level))
	}

	/// Assigns a facet, or refreshes the existing assignment.
	///
	/// Idempotent: repeated calls leave exactly one active row whose timestamps,
	/// expiry and review date reflect the latest call. Every call appends an
	/// `ASSIGNED` history row.
	///
	/// # Errors
	///
	/// - [`AuthError::UndefinedFacet`] if `facet` is not in the catalog
	/// - [`AuthError::InvalidExpiry`] if an explicit expiry is not in the future, or
	///   the definition's expiry or review interval is negative or out of range
	#[instrument(skip(self, options), fields(entity = %entity, facet = %facet, actor = %actor))]
	pub async fn assign(
		&self,
		facet: &FacetRef,
		entity: &EntityRef,
		actor: UserId,
		options: AssignOptions,
	) -> AuthResult<FacetAssignment> {
		let definition = self
			.store
			.find_definition(facet)
			.await?
			.ok_or_else(|| AuthError::UndefinedFacet(facet.to_string()))?;

		let now = Utc::now();
		if let Some(at) = options.expires_at {
			if at <= now {
				return Err(AuthError::InvalidExpiry(format!(
					"expiry {} is not in the future",
					at.to_rfc3339()
				)));
			}
		}

		let expires_at = match options.expires_at {
			Some(at) => Some(at),
			None => definition.default_expiry(now)?,
		};
		let review_at = definition.review_at(now)?;

		let new = NewAssignment {
			facet_id: definition.id,
			entity: *entity,
			assigned_by: actor,
			assigned_at: now,
			expires_at,
			review_at,
			reason: options.reason,
			metadata: options.metadata,
		};

		let assignment = self.store.upsert_assignment(&new).await?;
		self
			.store
			.append_history(&FacetHistoryEntry::assigned(&new))
			.await?;

		if definition.requires_audit {
			info!(
				facet_id = %definition.id,
				expires_at = ?assignment.expires_at,
				"audited facet assigned"
			);
		} else {
			debug!(facet_id = %definition.id, "facet assigned");
		}

		Ok(assignment)
	}

	/// Revokes a facet.
	///
	/// A no-op returning `false` when the facet is undefined or the entity has no
	/// active assignment; no history row is written in that case.
	#[instrument(skip(self, reason), fields(entity = %entity, facet = %facet, actor = %actor))]
	pub async fn revoke(
		&self,
		facet: &FacetRef,
		entity: &EntityRef,
		actor: UserId,
		reason: Option<String>,
	) -> AuthResult<bool> {
		let Some(definition) = self.store.find_definition(facet).await? else {
			debug!("facet not defined, nothing to revoke");
			return Ok(false);
		};

		if self
			.store
			.find_active_assignment(definition.id, entity)
			.await?
			.is_none()
		{
			debug!("no active assignment, nothing to revoke");
			return Ok(false);
		}

		let changed = self
			.store
			.deactivate_assignments(definition.id, entity)
			.await?;
		self
			.store
			.append_history(&FacetHistoryEntry::revoked(
				definition.id,
				*entity,
				actor,
				reason,
			))
			.await?;

		if definition.requires_audit {
			info!(facet_id = %definition.id, rows = changed, "audited facet revoked");
		} else {
			debug!(facet_id = %definition.id, rows = changed, "facet revoked");
		}

		Ok(changed > 0)
	}

	/// Assign/revoke history for the entity, oldest first.
	pub async fn list_history(
		&self,
		entity: &EntityRef,
		facet: Option<&FacetRef>,
	) -> AuthResult<Vec<FacetHistoryEntry>> {
		let facet_id = match facet {
			Some(facet) => match self.store.find_definition(facet).await? {
				Some(definition) => Some(definition.id),
				None => return Ok(Vec::new()),
			},
			None => None,
		};
		Ok(self.store.list_history(entity, facet_id).await?)
	}
}
