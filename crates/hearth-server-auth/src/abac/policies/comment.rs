// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Comment policies.
//!
//! Comments on an approved community post follow the community: active
//! membership is the only thing that matters. Everything else, including a
//! community post still awaiting approval, defers to the content read policy.

use tracing::instrument;

use super::content;
use crate::abac::decision::{DecisionBuilder, Operation, PermissionResult, ReasonCode};
use crate::abac::engine::DecisionEngine;
use crate::abac::types::{CommentAttrs, ContentAttrs};
use crate::context::AuthenticationContext;
use crate::error::AuthResult;
use crate::types::CommunityRole;

/// May the caller comment on this item?
#[instrument(level = "debug", skip_all, fields(content_id = %target.id, actor = ?ctx.user_id()))]
pub async fn can_create(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	target: &ContentAttrs,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommentCreate, target.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if engine.is_posting_suspended(user_id).await? {
		return Ok(decision.deny(ReasonCode::PostingSuspended));
	}

	if let Some(post) = target.community.filter(|post| post.is_approved()) {
		let role = engine.community_role_by_id(post.community_id, user_id).await?;
		return Ok(match role {
			Some(_) => decision.grant(ReasonCode::CommunityMember),
			None => decision.deny(ReasonCode::NotCommunityMember),
		});
	}

	if !target.comments_enabled && !target.is_authored_by(user_id) {
		return Ok(decision.deny(ReasonCode::CommentsDisabled));
	}

	content::evaluate_read(engine, ctx, target, &decision).await
}

/// May the caller read this comment? Anyone who can read the content can.
#[instrument(level = "debug", skip_all, fields(comment_id = %comment.id, actor = ?ctx.user_id()))]
pub async fn can_read(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	comment: &CommentAttrs,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommentRead, comment.id);
	content::evaluate_read(engine, ctx, &comment.content, &decision).await
}

#[instrument(level = "debug", skip_all, fields(comment_id = %comment.id, actor = ?ctx.user_id()))]
pub async fn can_update(
	_engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	comment: &CommentAttrs,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommentUpdate, comment.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if comment.author_id == user_id {
		return Ok(decision.grant(ReasonCode::Owner));
	}

	Ok(decision.default_deny())
}

/// May the caller delete this comment?
///
/// The comment's author and the content's author both may, then staff, then
/// moderators of the community the content lives in.
#[instrument(level = "debug", skip_all, fields(comment_id = %comment.id, actor = ?ctx.user_id()))]
pub async fn can_delete(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	comment: &CommentAttrs,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::CommentDelete, comment.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if comment.author_id == user_id || comment.content.is_authored_by(user_id) {
		return Ok(decision.grant(ReasonCode::Owner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}
	if engine.is_content_moderator(user_id).await? {
		return Ok(decision.grant(ReasonCode::ContentModerator));
	}

	if let Some(community_id) = comment.content.community_id() {
		let role = engine.community_role_by_id(community_id, user_id).await?;
		if role.is_some_and(|r| r >= CommunityRole::Moderator) {
			return Ok(decision.grant(ReasonCode::CommunityModerator));
		}
	}

	Ok(decision.default_deny())
}
