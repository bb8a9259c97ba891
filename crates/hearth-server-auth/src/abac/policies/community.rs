// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Community policies, including posts, members and applications.
//!
//! Moderation actions compare roles on the fixed ordinal
//! owner > admin > moderator > member. An actor may act only on strictly lower
//! roles, except the owner, who may act on anyone but itself. Nobody changes
//! their own role.

use tracing::instrument;

use crate::abac::decision::{DecisionBuilder, Operation, PermissionResult, ReasonCode};
use crate::abac::engine::DecisionEngine;
use crate::community::{Community, CommunityMembership};
use crate::context::AuthenticationContext;
use crate::error::AuthResult;
use crate::types::{CommunityRole, JoinPolicy, MembershipStatus};

fn role_code(role: CommunityRole) -> ReasonCode {
	match role {
		CommunityRole::Owner => ReasonCode::CommunityOwner,
		CommunityRole::Admin => ReasonCode::CommunityAdmin,
		CommunityRole::Moderator => ReasonCode::CommunityModerator,
		CommunityRole::Member => ReasonCode::CommunityMember,
	}
}

/// Denial for a caller whose role falls short of `required`.
fn short_of(decision: &DecisionBuilder, role: Option<CommunityRole>, required: CommunityRole) -> PermissionResult {
	match role {
		Some(_) => decision.deny_with_reason(
			ReasonCode::InsufficientRole,
			format!("Requires the {required} role or higher"),
		),
		None => decision.deny(ReasonCode::NotCommunityMember),
	}
}

#[instrument(level = "debug", skip_all, fields(community_id = %community.id, actor = ?ctx.user_id()))]
pub async fn can_view(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityView, community.id);
	if community.is_public() {
		return Ok(decision.grant(ReasonCode::PublicCommunity));
	}

	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if community.owner_id == user_id {
		return Ok(decision.grant(ReasonCode::CommunityOwner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}
	if let Some(role) = engine.community_role(community, user_id).await? {
		return Ok(decision.grant(role_code(role)));
	}

	Ok(decision.default_deny())
}

/// Settings changes: owner, global admin, or a community admin.
#[instrument(level = "debug", skip_all, fields(community_id = %community.id, actor = ?ctx.user_id()))]
pub async fn can_update(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityUpdate, community.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if community.owner_id == user_id {
		return Ok(decision.grant(ReasonCode::CommunityOwner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}

	let role = engine.community_role(community, user_id).await?;
	match role {
		Some(r) if r >= CommunityRole::Admin => Ok(decision.grant(role_code(r))),
		_ => Ok(short_of(&decision, role, CommunityRole::Admin)),
	}
}

#[instrument(level = "debug", skip_all, fields(community_id = %community.id, actor = ?ctx.user_id()))]
pub async fn can_delete(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityDelete, community.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if community.owner_id == user_id {
		return Ok(decision.grant(ReasonCode::CommunityOwner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}

	Ok(decision.default_deny())
}

/// Direct join; only open communities allow it.
#[instrument(level = "debug", skip_all, fields(community_id = %community.id, actor = ?ctx.user_id()))]
pub async fn can_join(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityJoin, community.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if community.owner_id == user_id {
		return Ok(decision.deny(ReasonCode::AlreadyMember));
	}
	let membership = engine.communities().membership(community.id, user_id).await?;
	match membership.map(|m| m.status) {
		Some(MembershipStatus::Banned) => return Ok(decision.deny(ReasonCode::Banned)),
		Some(MembershipStatus::Active) => return Ok(decision.deny(ReasonCode::AlreadyMember)),
		_ => {}
	}

	Ok(match community.join_policy {
		JoinPolicy::Open => decision.grant(ReasonCode::OpenCommunity),
		JoinPolicy::Approval => decision.deny(ReasonCode::ApplicationRequired),
	})
}

/// Application to an approval-gated community.
#[instrument(level = "debug", skip_all, fields(community_id = %community.id, actor = ?ctx.user_id()))]
pub async fn can_apply(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityApply, community.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if community.owner_id == user_id {
		return Ok(decision.deny(ReasonCode::AlreadyMember));
	}
	let membership = engine.communities().membership(community.id, user_id).await?;
	match membership.map(|m| m.status) {
		Some(MembershipStatus::Banned) => return Ok(decision.deny(ReasonCode::Banned)),
		Some(MembershipStatus::Active) => return Ok(decision.deny(ReasonCode::AlreadyMember)),
		Some(MembershipStatus::Pending) => {
			return Ok(decision.deny_with_reason(
				ReasonCode::RequestPending,
				"An application is already pending",
			))
		}
		_ => {}
	}

	Ok(match community.join_policy {
		JoinPolicy::Approval => decision.grant(ReasonCode::ApplicationRequired),
		JoinPolicy::Open => decision.deny(ReasonCode::OpenCommunity),
	})
}

#[instrument(level = "debug", skip_all, fields(community_id = %community.id, actor = ?ctx.user_id()))]
pub async fn can_leave(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityLeave, community.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if community.owner_id == user_id {
		return Ok(decision.deny(ReasonCode::OwnerCannotLeave));
	}

	Ok(match engine.community_role(community, user_id).await? {
		Some(_) => decision.grant(ReasonCode::CommunityMember),
		None => decision.deny(ReasonCode::NotCommunityMember),
	})
}

#[instrument(level = "debug", skip_all, fields(community_id = %community.id, actor = ?ctx.user_id()))]
pub async fn can_post(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityPost, community.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if engine.is_posting_suspended(user_id).await? {
		return Ok(decision.deny(ReasonCode::PostingSuspended));
	}

	Ok(match engine.community_role(community, user_id).await? {
		Some(role) => decision.grant(role_code(role)),
		None => decision.deny(ReasonCode::NotCommunityMember),
	})
}

#[instrument(level = "debug", skip_all, fields(community_id = %community.id, actor = ?ctx.user_id()))]
pub async fn can_approve_post(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityApprovePost, community.id);
	moderator_action(engine, ctx, community, &decision).await
}

/// Approve or reject a pending application.
#[instrument(level = "debug", skip_all, fields(community_id = %community.id, actor = ?ctx.user_id()))]
pub async fn can_review_application(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
	application: &CommunityMembership,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityReviewApplication, community.id);
	if ctx.user_id().is_none() {
		return Ok(decision.not_authenticated());
	}
	if application.status != MembershipStatus::Pending {
		return Ok(decision.deny(ReasonCode::NotPending));
	}
	moderator_action(engine, ctx, community, &decision).await
}

/// Actions open to moderators and above.
async fn moderator_action(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
	decision: &DecisionBuilder,
) -> AuthResult<PermissionResult> {
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if community.owner_id == user_id {
		return Ok(decision.grant(ReasonCode::CommunityOwner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}

	let role = engine.community_role(community, user_id).await?;
	match role {
		Some(r) if r >= CommunityRole::Moderator => Ok(decision.grant(role_code(r))),
		_ => Ok(short_of(decision, role, CommunityRole::Moderator)),
	}
}

#[instrument(level = "debug", skip_all, fields(community_id = %community.id, target = %target.user_id, actor = ?ctx.user_id()))]
pub async fn can_remove_member(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
	target: &CommunityMembership,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityRemoveMember, target.user_id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if target.user_id == user_id {
		return Ok(decision.deny_with_reason(
			ReasonCode::InsufficientRole,
			"Use leave to exit a community",
		));
	}
	let target_role = effective_target_role(community, target);

	let role = engine.community_role(community, user_id).await?;
	if role == Some(CommunityRole::Owner) {
		return Ok(decision.grant(ReasonCode::CommunityOwner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}

	match role {
		Some(r) if r >= CommunityRole::Moderator && r > target_role => Ok(decision.grant(role_code(r))),
		_ => Ok(short_of(&decision, role, CommunityRole::Moderator)),
	}
}

/// Change `target`'s role to `new_role`.
///
/// Ownership is never granted this way. Admins may promote or demote anyone
/// below them, to any role below their own.
#[instrument(level = "debug", skip_all, fields(community_id = %community.id, target = %target.user_id, new_role = %new_role, actor = ?ctx.user_id()))]
pub async fn can_change_role(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	community: &Community,
	target: &CommunityMembership,
	new_role: CommunityRole,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommunityChangeRole, target.user_id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if target.user_id == user_id {
		return Ok(decision.deny(ReasonCode::SelfRoleChange));
	}
	if new_role == CommunityRole::Owner {
		return Ok(decision.deny(ReasonCode::InvalidRole));
	}
	let target_role = effective_target_role(community, target);

	let role = engine.community_role(community, user_id).await?;
	if role == Some(CommunityRole::Owner) {
		return Ok(decision.grant(ReasonCode::CommunityOwner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}

	match role {
		Some(r) if r >= CommunityRole::Admin && r > target_role && r > new_role => {
			Ok(decision.grant(role_code(r)))
		}
		_ => Ok(short_of(&decision, role, CommunityRole::Admin)),
	}
}

fn effective_target_role(community: &Community, target: &CommunityMembership) -> CommunityRole {
	if community.owner_id == target.user_id {
		CommunityRole::Owner
	} else {
		target.role
	}
}
