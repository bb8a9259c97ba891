// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decision values produced by every policy function.
//!
//! A [`PermissionResult`] is either `Granted` or `Denied`, and both variants carry
//! the same [`Decision`] payload. Callers read the payload through accessors that
//! work on either variant and branch only on [`PermissionResult::is_granted`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::AuthenticationContext;
use crate::types::UserId;

/// Every operation the decision engine can rule on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
	#[serde(rename = "content.read")]
	ContentRead,
	#[serde(rename = "content.create")]
	ContentCreate,
	#[serde(rename = "content.create_paywalled")]
	ContentCreatePaywalled,
	#[serde(rename = "content.update")]
	ContentUpdate,
	#[serde(rename = "content.delete")]
	ContentDelete,

	#[serde(rename = "comment.create")]
	CommentCreate,
	#[serde(rename = "comment.read")]
	CommentRead,
	#[serde(rename = "comment.update")]
	CommentUpdate,
	#[serde(rename = "comment.delete")]
	CommentDelete,

	#[serde(rename = "connection.send")]
	ConnectionSend,
	#[serde(rename = "connection.respond")]
	ConnectionRespond,
	#[serde(rename = "connection.cancel")]
	ConnectionCancel,
	#[serde(rename = "connection.view")]
	ConnectionView,
	#[serde(rename = "connection.remove")]
	ConnectionRemove,

	#[serde(rename = "facet.assign")]
	FacetAssign,
	#[serde(rename = "facet.revoke")]
	FacetRevoke,
	#[serde(rename = "facet.view")]
	FacetView,

	#[serde(rename = "community.view")]
	CommunityView,
	#[serde(rename = "community.update")]
	CommunityUpdate,
	#[serde(rename = "community.delete")]
	CommunityDelete,
	#[serde(rename = "community.join")]
	CommunityJoin,
	#[serde(rename = "community.apply")]
	CommunityApply,
	#[serde(rename = "community.leave")]
	CommunityLeave,
	#[serde(rename = "community.post")]
	CommunityPost,
	#[serde(rename = "community.approve_post")]
	CommunityApprovePost,
	#[serde(rename = "community.remove_member")]
	CommunityRemoveMember,
	#[serde(rename = "community.change_role")]
	CommunityChangeRole,
	#[serde(rename = "community.review_application")]
	CommunityReviewApplication,

	/// The outcome of combining several decisions.
	#[serde(rename = "composite")]
	Composite,
}

impl Operation {
	pub fn as_str(&self) -> &'static str {
		match self {
			Operation::ContentRead => "content.read",
			Operation::ContentCreate => "content.create",
			Operation::ContentCreatePaywalled => "content.create_paywalled",
			Operation::ContentUpdate => "content.update",
			Operation::ContentDelete => "content.delete",
			Operation::CommentCreate => "comment.create",
			Operation::CommentRead => "comment.read",
			Operation::CommentUpdate => "comment.update",
			Operation::CommentDelete => "comment.delete",
			Operation::ConnectionSend => "connection.send",
			Operation::ConnectionRespond => "connection.respond",
			Operation::ConnectionCancel => "connection.cancel",
			Operation::ConnectionView => "connection.view",
			Operation::ConnectionRemove => "connection.remove",
			Operation::FacetAssign => "facet.assign",
			Operation::FacetRevoke => "facet.revoke",
			Operation::FacetView => "facet.view",
			Operation::CommunityView => "community.view",
			Operation::CommunityUpdate => "community.update",
			Operation::CommunityDelete => "community.delete",
			Operation::CommunityJoin => "community.join",
			Operation::CommunityApply => "community.apply",
			Operation::CommunityLeave => "community.leave",
			Operation::CommunityPost => "community.post",
			Operation::CommunityApprovePost => "community.approve_post",
			Operation::CommunityRemoveMember => "community.remove_member",
			Operation::CommunityChangeRole => "community.change_role",
			Operation::CommunityReviewApplication => "community.review_application",
			Operation::Composite => "composite",
		}
	}

	/// The resource kind this operation belongs to (the part before the dot).
	pub fn resource_type(&self) -> &'static str {
		let s = self.as_str();
		s.split_once('.').map(|(kind, _)| kind).unwrap_or(s)
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Machine-readable reason attached to every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
	// Generic outcomes
	NotAuthenticated,
	DefaultDeny,
	PermissionCheckError,
	Authenticated,

	// Ownership and visibility
	Owner,
	PublicContent,
	PublicCommunity,
	Friends,
	SameDivision,
	Manager,

	// Platform facets
	GlobalAdmin,
	ContentModerator,
	Support,
	ScopeAdmin,
	CreatorTier,
	PostingSuspended,

	// Comments
	CommentsDisabled,

	// Connections
	SelfConnection,
	AlreadyConnected,
	RequestPending,
	RequestNotPending,
	Participant,

	// Facet administration
	SelfAssignment,

	// Communities
	CommunityMember,
	CommunityModerator,
	CommunityAdmin,
	CommunityOwner,
	NotCommunityMember,
	InsufficientRole,
	SelfRoleChange,
	InvalidRole,
	AlreadyMember,
	Banned,
	OpenCommunity,
	ApplicationRequired,
	NotPending,
	OwnerCannotLeave,
}

impl ReasonCode {
	/// Default human-readable explanation for this code.
	pub fn describe(&self) -> &'static str {
		match self {
			ReasonCode::NotAuthenticated => "Authentication is required",
			ReasonCode::DefaultDeny => "No rule grants this operation",
			ReasonCode::PermissionCheckError => "The permission check failed",
			ReasonCode::Authenticated => "Any authenticated user may do this",
			ReasonCode::Owner => "Caller owns the resource",
			ReasonCode::PublicContent => "Content is public",
			ReasonCode::PublicCommunity => "Community is public",
			ReasonCode::Friends => "Caller is connected with the owner",
			ReasonCode::SameDivision => "Caller shares a division with the owner",
			ReasonCode::Manager => "Caller manages the owner",
			ReasonCode::GlobalAdmin => "Caller is a global administrator",
			ReasonCode::ContentModerator => "Caller is a content moderator",
			ReasonCode::Support => "Caller is platform support",
			ReasonCode::ScopeAdmin => "Caller administers this facet scope",
			ReasonCode::CreatorTier => "Caller's creator tier allows this",
			ReasonCode::PostingSuspended => "Caller's posting privileges are suspended",
			ReasonCode::CommentsDisabled => "Comments are disabled on this content",
			ReasonCode::SelfConnection => "Cannot connect with yourself",
			ReasonCode::AlreadyConnected => "Users are already connected",
			ReasonCode::RequestPending => "A connection request is already pending",
			ReasonCode::RequestNotPending => "Connection request is no longer pending",
			ReasonCode::Participant => "Caller is a party to the request",
			ReasonCode::SelfAssignment => "Cannot change your own facets",
			ReasonCode::CommunityMember => "Caller is an active community member",
			ReasonCode::CommunityModerator => "Caller moderates the community",
			ReasonCode::CommunityAdmin => "Caller administers the community",
			ReasonCode::CommunityOwner => "Caller owns the community",
			ReasonCode::NotCommunityMember => "Caller is not an active community member",
			ReasonCode::InsufficientRole => "Caller's community role is not high enough",
			ReasonCode::SelfRoleChange => "Cannot change your own community role",
			ReasonCode::InvalidRole => "The requested role cannot be granted",
			ReasonCode::AlreadyMember => "Caller is already a member",
			ReasonCode::Banned => "Caller is banned from the community",
			ReasonCode::OpenCommunity => "Community is open to new members",
			ReasonCode::ApplicationRequired => "Community accepts applications",
			ReasonCode::NotPending => "There is no pending application",
			ReasonCode::OwnerCannotLeave => "The owner cannot leave their community",
		}
	}
}

impl fmt::Display for ReasonCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let value = serde_json::to_value(self).map_err(|_| fmt::Error)?;
		match value.as_str() {
			Some(s) => f.write_str(s),
			None => Err(fmt::Error),
		}
	}
}

/// The payload shared by granted and denied outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
	pub actor_id: Option<UserId>,
	pub resource_id: Option<String>,
	pub operation: Operation,
	pub reason: String,
	pub reason_code: ReasonCode,
	pub metadata: Option<serde_json::Value>,
	pub timestamp: DateTime<Utc>,
}

/// The outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "decision", rename_all = "snake_case")]
pub enum PermissionResult {
	Granted(Decision),
	Denied(Decision),
}

impl PermissionResult {
	pub fn is_granted(&self) -> bool {
		matches!(self, PermissionResult::Granted(_))
	}

	pub fn decision(&self) -> &Decision {
		match self {
			PermissionResult::Granted(d) | PermissionResult::Denied(d) => d,
		}
	}

	pub fn into_decision(self) -> Decision {
		match self {
			PermissionResult::Granted(d) | PermissionResult::Denied(d) => d,
		}
	}

	pub fn actor_id(&self) -> Option<UserId> {
		self.decision().actor_id
	}

	pub fn resource_id(&self) -> Option<&str> {
		self.decision().resource_id.as_deref()
	}

	pub fn operation(&self) -> Operation {
		self.decision().operation
	}

	pub fn reason(&self) -> &str {
		&self.decision().reason
	}

	pub fn reason_code(&self) -> ReasonCode {
		self.decision().reason_code
	}

	pub fn metadata(&self) -> Option<&serde_json::Value> {
		self.decision().metadata.as_ref()
	}

	pub fn timestamp(&self) -> DateTime<Utc> {
		self.decision().timestamp
	}

	/// Attach metadata, keeping the outcome.
	pub fn with_metadata(self, metadata: serde_json::Value) -> Self {
		match self {
			PermissionResult::Granted(mut d) => {
				d.metadata = Some(metadata);
				PermissionResult::Granted(d)
			}
			PermissionResult::Denied(mut d) => {
				d.metadata = Some(metadata);
				PermissionResult::Denied(d)
			}
		}
	}
}

/// Builds decisions for one (caller, operation, resource) triple.
#[derive(Debug, Clone)]
pub struct DecisionBuilder {
	actor_id: Option<UserId>,
	operation: Operation,
	resource_id: Option<String>,
}

impl DecisionBuilder {
	pub fn new(ctx: &AuthenticationContext, operation: Operation, resource_id: impl fmt::Display) -> Self {
		Self {
			actor_id: ctx.user_id(),
			operation,
			resource_id: Some(resource_id.to_string()),
		}
	}

	/// A builder for operations that do not target an existing resource.
	pub fn unscoped(ctx: &AuthenticationContext, operation: Operation) -> Self {
		Self {
			actor_id: ctx.user_id(),
			operation,
			resource_id: None,
		}
	}

	pub fn operation(&self) -> Operation {
		self.operation
	}

	fn decision(&self, code: ReasonCode, reason: String) -> Decision {
		Decision {
			actor_id: self.actor_id,
			resource_id: self.resource_id.clone(),
			operation: self.operation,
			reason,
			reason_code: code,
			metadata: None,
			timestamp: Utc::now(),
		}
	}

	pub fn grant(&self, code: ReasonCode) -> PermissionResult {
		PermissionResult::Granted(self.decision(code, code.describe().to_string()))
	}

	pub fn deny(&self, code: ReasonCode) -> PermissionResult {
		PermissionResult::Denied(self.decision(code, code.describe().to_string()))
	}

	pub fn deny_with_reason(&self, code: ReasonCode, reason: impl Into<String>) -> PermissionResult {
		PermissionResult::Denied(self.decision(code, reason.into()))
	}

	/// The standard "authentication required" denial.
	pub fn not_authenticated(&self) -> PermissionResult {
		self.deny(ReasonCode::NotAuthenticated)
	}

	/// The standard "nothing matched" denial.
	pub fn default_deny(&self) -> PermissionResult {
		self.deny(ReasonCode::DefaultDeny)
	}
}
