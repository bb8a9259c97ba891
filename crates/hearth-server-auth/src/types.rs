// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for authorization.
//!
//! This module defines the foundational types used throughout the decision engine:
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for different entity types
//!   ([`UserId`], [`ContentId`], [`CommunityId`], etc.) preventing accidental mixing
//! - **Entity references**: ([`EntityType`], [`EntityRef`]) the subjects facets attach to
//! - **Visibility levels**: Access classes for content ([`Visibility`]) and communities
//!   ([`CommunityVisibility`])
//! - **Community roles**: The ordinal role ladder used by moderation actions ([`CommunityRole`])
//!
//! All ID types implement transparent serde serialization (as UUID strings) and
//! provide conversion to/from [`uuid::Uuid`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(DivisionId, "Unique identifier for an organizational division.");
define_id_type!(ContentId, "Unique identifier for a content item.");
define_id_type!(CommentId, "Unique identifier for a comment.");
define_id_type!(CommunityId, "Unique identifier for a community.");
define_id_type!(
	ConnectionRequestId,
	"Unique identifier for a connection (friend) request."
);
define_id_type!(FacetId, "Unique identifier for a facet definition.");
define_id_type!(AssignmentId, "Unique identifier for a facet assignment.");

// =============================================================================
// Entities
// =============================================================================

/// Kinds of entities a facet can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
	User,
	Content,
	Community,
	Division,
}

impl EntityType {
	pub fn as_str(&self) -> &'static str {
		match self {
			EntityType::User => "user",
			EntityType::Content => "content",
			EntityType::Community => "community",
			EntityType::Division => "division",
		}
	}
}

impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EntityType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"user" => Ok(EntityType::User),
			"content" => Ok(EntityType::Content),
			"community" => Ok(EntityType::Community),
			"division" => Ok(EntityType::Division),
			other => Err(format!("unknown entity type: {other}")),
		}
	}
}

/// A typed pointer at the entity a facet is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
	pub entity_type: EntityType,
	pub entity_id: Uuid,
}

impl EntityRef {
	pub fn new(entity_type: EntityType, entity_id: Uuid) -> Self {
		Self {
			entity_type,
			entity_id,
		}
	}

	pub fn user(user_id: UserId) -> Self {
		Self::new(EntityType::User, user_id.into_inner())
	}

	pub fn content(content_id: ContentId) -> Self {
		Self::new(EntityType::Content, content_id.into_inner())
	}

	pub fn community(community_id: CommunityId) -> Self {
		Self::new(EntityType::Community, community_id.into_inner())
	}

	pub fn division(division_id: DivisionId) -> Self {
		Self::new(EntityType::Division, division_id.into_inner())
	}

	/// Returns the user this reference points at, if it is a user.
	pub fn as_user(&self) -> Option<UserId> {
		match self.entity_type {
			EntityType::User => Some(UserId::new(self.entity_id)),
			_ => None,
		}
	}
}

impl fmt::Display for EntityRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.entity_type, self.entity_id)
	}
}

// =============================================================================
// Visibility
// =============================================================================

/// Who may see a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
	/// Only the author (and platform staff).
	#[default]
	Private,
	/// The author's accepted connections.
	Friends,
	/// Users in the author's division.
	Division,
	/// Active members of the owning community.
	Community,
	/// Anyone, including anonymous callers.
	Public,
}

impl fmt::Display for Visibility {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Visibility::Private => write!(f, "private"),
			Visibility::Friends => write!(f, "friends"),
			Visibility::Division => write!(f, "division"),
			Visibility::Community => write!(f, "community"),
			Visibility::Public => write!(f, "public"),
		}
	}
}

/// Who may see a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommunityVisibility {
	#[default]
	Public,
	Private,
}

/// How new members get into a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
	/// Anyone may join directly.
	#[default]
	Open,
	/// Prospective members apply and a moderator reviews the application.
	Approval,
}

// =============================================================================
// Community Roles
// =============================================================================

/// Roles within a community, ordered from least to most privileged.
///
/// The derived `Ord` follows declaration order, so `Owner > Admin > Moderator > Member`.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CommunityRole {
	Member,
	Moderator,
	Admin,
	Owner,
}

impl CommunityRole {
	/// Returns all roles, least privileged first.
	pub fn all() -> &'static [CommunityRole] {
		&[
			CommunityRole::Member,
			CommunityRole::Moderator,
			CommunityRole::Admin,
			CommunityRole::Owner,
		]
	}

	/// Ordinal rank (member = 0, owner = 3).
	pub fn rank(&self) -> u8 {
		match self {
			CommunityRole::Member => 0,
			CommunityRole::Moderator => 1,
			CommunityRole::Admin => 2,
			CommunityRole::Owner => 3,
		}
	}

	/// Returns true if this role has at least the permissions of the given role.
	pub fn has_permission_of(&self, other: &CommunityRole) -> bool {
		self >= other
	}
}

impl fmt::Display for CommunityRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CommunityRole::Member => write!(f, "member"),
			CommunityRole::Moderator => write!(f, "moderator"),
			CommunityRole::Admin => write!(f, "admin"),
			CommunityRole::Owner => write!(f, "owner"),
		}
	}
}

impl FromStr for CommunityRole {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"member" => Ok(CommunityRole::Member),
			"moderator" => Ok(CommunityRole::Moderator),
			"admin" => Ok(CommunityRole::Admin),
			"owner" => Ok(CommunityRole::Owner),
			other => Err(format!("unknown community role: {other}")),
		}
	}
}

/// State of a community membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
	Active,
	/// An application awaiting review.
	Pending,
	Banned,
	Left,
}

impl fmt::Display for MembershipStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MembershipStatus::Active => write!(f, "active"),
			MembershipStatus::Pending => write!(f, "pending"),
			MembershipStatus::Banned => write!(f, "banned"),
			MembershipStatus::Left => write!(f, "left"),
		}
	}
}

impl FromStr for MembershipStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"active" => Ok(MembershipStatus::Active),
			"pending" => Ok(MembershipStatus::Pending),
			"banned" => Ok(MembershipStatus::Banned),
			"left" => Ok(MembershipStatus::Left),
			other => Err(format!("unknown membership status: {other}")),
		}
	}
}

/// State of a connection (friend) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
	Pending,
	Accepted,
	Rejected,
	Cancelled,
}

impl fmt::Display for ConnectionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConnectionStatus::Pending => write!(f, "pending"),
			ConnectionStatus::Accepted => write!(f, "accepted"),
			ConnectionStatus::Rejected => write!(f, "rejected"),
			ConnectionStatus::Cancelled => write!(f, "cancelled"),
		}
	}
}

impl FromStr for ConnectionStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(ConnectionStatus::Pending),
			"accepted" => Ok(ConnectionStatus::Accepted),
			"rejected" => Ok(ConnectionStatus::Rejected),
			"cancelled" => Ok(ConnectionStatus::Cancelled),
			other => Err(format!("unknown connection status: {other}")),
		}
	}
}

/// Moderation state of a post submitted to a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
	Pending,
	Approved,
	Rejected,
}
