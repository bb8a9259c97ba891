// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The decision engine: the collaborators every policy function consults.
//!
//! Policies live in [`super::policies`], one module per resource kind. Each
//! takes `&DecisionEngine` and `&AuthenticationContext` and evaluates in a fixed
//! order:
//!
//! 1. **Authentication**: deny with `NOT_AUTHENTICATED` before any lookup
//!    (public read grants are checked even earlier)
//! 2. **Ownership**: the cheapest and most common grant
//! 3. **Elevated facets**: most specific first; the first match wins
//! 4. **Relationships**: friendship, management, community role
//! 5. **Default deny**

use std::sync::Arc;

use crate::community::Community;
use crate::error::AuthResult;
use crate::facet::{known, FacetCatalog, FacetRef};
use crate::relationship::RelationshipResolver;
use crate::store::CommunityStore;
use crate::types::{CommunityId, CommunityRole, EntityRef, UserId};

#[derive(Clone)]
pub struct DecisionEngine {
	facets: FacetCatalog,
	relationships: RelationshipResolver,
	communities: Arc<dyn CommunityStore>,
}

impl DecisionEngine {
	pub fn new(
		facets: FacetCatalog,
		relationships: RelationshipResolver,
		communities: Arc<dyn CommunityStore>,
	) -> Self {
		Self {
			facets,
			relationships,
			communities,
		}
	}

	pub fn facets(&self) -> &FacetCatalog {
		&self.facets
	}

	pub fn relationships(&self) -> &RelationshipResolver {
		&self.relationships
	}

	pub fn communities(&self) -> &dyn CommunityStore {
		self.communities.as_ref()
	}

	/// Returns true if the user holds an effective facet matching `facet`.
	pub async fn user_has_facet(&self, user_id: UserId, facet: &FacetRef) -> AuthResult<bool> {
		self.facets.has_facet(&EntityRef::user(user_id), facet).await
	}

	pub async fn is_global_admin(&self, user_id: UserId) -> AuthResult<bool> {
		self.user_has_facet(user_id, &known::global_admin()).await
	}

	pub async fn is_content_moderator(&self, user_id: UserId) -> AuthResult<bool> {
		self.user_has_facet(user_id, &known::content_moderator()).await
	}

	pub async fn is_posting_suspended(&self, user_id: UserId) -> AuthResult<bool> {
		self.user_has_facet(user_id, &known::posting_suspended()).await
	}

	/// The user's effective role in `community`.
	///
	/// The community's owner is always [`CommunityRole::Owner`]; everyone else
	/// needs an active membership row.
	pub async fn community_role(
		&self,
		community: &Community,
		user_id: UserId,
	) -> AuthResult<Option<CommunityRole>> {
		if community.owner_id == user_id {
			return Ok(Some(CommunityRole::Owner));
		}
		let membership = self.communities.membership(community.id, user_id).await?;
		Ok(membership.and_then(|m| m.active_role()))
	}

	/// Like [`Self::community_role`], for callers that only hold the id.
	pub async fn community_role_by_id(
		&self,
		community_id: CommunityId,
		user_id: UserId,
	) -> AuthResult<Option<CommunityRole>> {
		match self.communities.get_community(community_id).await? {
			Some(community) => self.community_role(&community, user_id).await,
			None => {
				let membership = self.communities.membership(community_id, user_id).await?;
				Ok(membership.and_then(|m| m.active_role()))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::community::CommunityMembership;
	use crate::testing::TestHarness;
	use crate::types::MembershipStatus;

	#[tokio::test]
	async fn owner_role_comes_from_community_record() {
		let harness = TestHarness::new();
		let owner = harness.user("owner");
		let owner_id = owner.user_id().unwrap();
		let community = harness.communities.insert(Community::new(owner_id, "gardening"));

		assert_eq!(
			harness.engine.community_role(&community, owner_id).await.unwrap(),
			Some(CommunityRole::Owner)
		);
	}

	#[tokio::test]
	async fn inactive_memberships_carry_no_role() {
		let harness = TestHarness::new();
		let community = harness
			.communities
			.insert(Community::new(UserId::generate(), "gardening"));
		let banned = UserId::generate();
		let active = UserId::generate();
		harness.communities.add_membership(CommunityMembership::new(
			community.id,
			banned,
			CommunityRole::Moderator,
			MembershipStatus::Banned,
		));
		harness.communities.add_membership(CommunityMembership::new(
			community.id,
			active,
			CommunityRole::Moderator,
			MembershipStatus::Active,
		));

		assert_eq!(harness.engine.community_role(&community, banned).await.unwrap(), None);
		assert_eq!(
			harness
				.engine
				.community_role_by_id(community.id, active)
				.await
				.unwrap(),
			Some(CommunityRole::Moderator)
		);
	}

	#[tokio::test]
	async fn global_admin_is_a_facet() {
		let harness = TestHarness::new();
		let ctx = harness.user("root");
		let user_id = ctx.user_id().unwrap();
		assert!(!harness.engine.is_global_admin(user_id).await.unwrap());
		harness.grant_facet(user_id, known::global_admin()).await;
		assert!(harness.engine.is_global_admin(user_id).await.unwrap());
	}
}
