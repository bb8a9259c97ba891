// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Content item policies.

use tracing::instrument;

use crate::abac::decision::{DecisionBuilder, Operation, PermissionResult, ReasonCode};
use crate::abac::engine::DecisionEngine;
use crate::abac::types::ContentAttrs;
use crate::context::AuthenticationContext;
use crate::error::AuthResult;
use crate::facet::known;
use crate::types::{CommunityRole, EntityRef, Visibility};

/// May the caller read this item?
#[instrument(level = "debug", skip_all, fields(content_id = %content.id, actor = ?ctx.user_id()))]
pub async fn can_read(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	content: &ContentAttrs,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::ContentRead, content.id);
	evaluate_read(engine, ctx, content, &decision).await
}

/// The read policy, reporting under whatever operation `decision` carries.
///
/// Comment reads and standalone comment creation defer to this.
pub(crate) async fn evaluate_read(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	content: &ContentAttrs,
	decision: &DecisionBuilder,
) -> AuthResult<PermissionResult> {
	if content.visibility == Visibility::Public {
		return Ok(decision.grant(ReasonCode::PublicContent));
	}

	let Some(user) = ctx.user() else {
		return Ok(decision.not_authenticated());
	};

	if content.is_authored_by(user.id) {
		return Ok(decision.grant(ReasonCode::Owner));
	}
	if engine.is_global_admin(user.id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}
	if engine.is_content_moderator(user.id).await? {
		return Ok(decision.grant(ReasonCode::ContentModerator));
	}

	match content.visibility {
		Visibility::Friends => {
			if engine
				.relationships()
				.is_friends_with(user.id, content.author_id)
				.await?
			{
				return Ok(decision.grant(ReasonCode::Friends));
			}
		}
		Visibility::Division => {
			let author = engine.relationships().get_user(content.author_id).await?;
			if author.is_some_and(|author| author.shares_division_with(user)) {
				return Ok(decision.grant(ReasonCode::SameDivision));
			}
		}
		Visibility::Community => {
			if let Some(community_id) = content.community_id() {
				if engine
					.community_role_by_id(community_id, user.id)
					.await?
					.is_some()
				{
					return Ok(decision.grant(ReasonCode::CommunityMember));
				}
			}
		}
		Visibility::Private | Visibility::Public => {}
	}

	Ok(decision.default_deny())
}

/// May the caller create content at all?
#[instrument(level = "debug", skip_all, fields(actor = ?ctx.user_id()))]
pub async fn can_create(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::unscoped(ctx, Operation::ContentCreate);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if engine.is_posting_suspended(user_id).await? {
		return Ok(decision.deny(ReasonCode::PostingSuspended));
	}

	Ok(decision.grant(ReasonCode::Authenticated))
}

/// May the caller create paywalled content?
///
/// Independent of [`can_create`]: a creator tier does not imply general
/// posting rights, nor the other way round.
#[instrument(level = "debug", skip_all, fields(actor = ?ctx.user_id()))]
pub async fn can_create_paywalled(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::unscoped(ctx, Operation::ContentCreatePaywalled);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}

	let creator = engine
		.facets()
		.has_facet_at_level(
			&EntityRef::user(user_id),
			known::CREATOR_SCOPE,
			known::PAYWALL_MIN_CREATOR_LEVEL,
		)
		.await?;
	if creator {
		return Ok(decision.grant(ReasonCode::CreatorTier));
	}

	Ok(decision.default_deny())
}

/// May the caller edit this item?
#[instrument(level = "debug", skip_all, fields(content_id = %content.id, actor = ?ctx.user_id()))]
pub async fn can_update(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	content: &ContentAttrs,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::ContentUpdate, content.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if content.is_authored_by(user_id) {
		return Ok(decision.grant(ReasonCode::Owner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}

	Ok(decision.default_deny())
}

/// May the caller delete this item?
#[instrument(level = "debug", skip_all, fields(content_id = %content.id, actor = ?ctx.user_id()))]
pub async fn can_delete(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	content: &ContentAttrs,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::ContentDelete, content.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if content.is_authored_by(user_id) {
		return Ok(decision.grant(ReasonCode::Owner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}
	if engine.is_content_moderator(user_id).await? {
		return Ok(decision.grant(ReasonCode::ContentModerator));
	}

	if let Some(community_id) = content.community_id() {
		let role = engine.community_role_by_id(community_id, user_id).await?;
		if role.is_some_and(|r| r >= CommunityRole::Moderator) {
			return Ok(decision.grant(ReasonCode::CommunityModerator));
		}
	}

	if engine
		.relationships()
		.is_administrator_for(user_id, content.author_id, true)
		.await?
	{
		return Ok(decision.grant(ReasonCode::Manager));
	}

	Ok(decision.default_deny())
}
