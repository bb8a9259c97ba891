// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization core for Hearth.
//!
//! Decides whether a caller may perform an operation and explains why:
//!
//! - [`facet`]: time-bounded attributes assigned to users, content and communities
//! - [`relationship`]: friendship and management-hierarchy facts
//! - [`abac`]: per-resource policies producing [`PermissionResult`]s
//!
//! Storage is reached only through the traits in [`store`].

pub mod abac;
pub mod community;
pub mod connection;
pub mod context;
pub mod error;
pub mod facet;
pub mod relationship;
pub mod store;
pub mod types;
pub mod user;

#[cfg(test)]
mod testing;

pub use abac::{
	filter_by_permission, policies, require_all, require_any, safe_permission_check, CommentAttrs,
	CommunityPostAttrs, ContentAttrs, Decision, DecisionBuilder, DecisionEngine, Operation,
	PermissionResult, ReasonCode,
};
pub use community::{Community, CommunityMembership};
pub use connection::ConnectionRequest;
pub use context::{AuthenticationContext, RequestMetadata};
pub use error::{AuthError, AuthResult, StoreError};
pub use facet::{
	AssignOptions, FacetAssignment, FacetCatalog, FacetDefinition, FacetHistoryEntry, FacetRef,
	FacetWithAssignment, HistoryAction, NewAssignment,
};
pub use relationship::{RelationshipResolver, MAX_HIERARCHY_DEPTH};
pub use store::{CommunityStore, ConnectionStore, FacetStore, UserDirectory};
pub use types::{
	AssignmentId, CommentId, CommunityId, CommunityRole, CommunityVisibility, ConnectionRequestId,
	ConnectionStatus, ContentId, DivisionId, EntityRef, EntityType, FacetId, JoinPolicy,
	MembershipStatus, PostStatus, UserId, Visibility,
};
pub use user::UserRecord;
