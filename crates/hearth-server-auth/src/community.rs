// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Community records consumed by the community policies.
//!
//! This module provides:
//! - [`Community`] - a user-created group with its own visibility and join policy
//! - [`CommunityMembership`] - links users to communities with a role and status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CommunityId, CommunityRole, CommunityVisibility, JoinPolicy, MembershipStatus, UserId};

/// A community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
	pub id: CommunityId,
	pub name: String,
	pub owner_id: UserId,
	pub visibility: CommunityVisibility,
	pub join_policy: JoinPolicy,
	pub created_at: DateTime<Utc>,
}

impl Community {
	/// Creates a public, open community.
	pub fn new(owner_id: UserId, name: impl Into<String>) -> Self {
		Self {
			id: CommunityId::generate(),
			name: name.into(),
			owner_id,
			visibility: CommunityVisibility::Public,
			join_policy: JoinPolicy::Open,
			created_at: Utc::now(),
		}
	}

	/// Builder: set visibility.
	pub fn with_visibility(mut self, visibility: CommunityVisibility) -> Self {
		self.visibility = visibility;
		self
	}

	/// Builder: set join policy.
	pub fn with_join_policy(mut self, join_policy: JoinPolicy) -> Self {
		self.join_policy = join_policy;
		self
	}

	pub fn is_public(&self) -> bool {
		self.visibility == CommunityVisibility::Public
	}
}

/// A user's membership (or application, or ban) in a community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityMembership {
	pub community_id: CommunityId,
	pub user_id: UserId,
	pub role: CommunityRole,
	pub status: MembershipStatus,
	pub joined_at: DateTime<Utc>,
}

impl CommunityMembership {
	pub fn new(
		community_id: CommunityId,
		user_id: UserId,
		role: CommunityRole,
		status: MembershipStatus,
	) -> Self {
		Self {
			community_id,
			user_id,
			role,
			status,
			joined_at: Utc::now(),
		}
	}

	pub fn is_active(&self) -> bool {
		self.status == MembershipStatus::Active
	}

	/// The role, if the membership is active.
	pub fn active_role(&self) -> Option<CommunityRole> {
		self.is_active().then_some(self.role)
	}
}
