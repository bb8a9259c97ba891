// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Who may assign, revoke and inspect facets.
//!
//! Global admins manage every scope. A `facet_admin:<scope>` facet delegates
//! one scope, except `role` and `facet_admin`, which stay with global admins so
//! a scope admin cannot mint new admins. Managers may additionally hand out facets in the delegable
//! `team` scope to anyone in their reporting tree. Nobody changes their own
//! facets.

use tracing::instrument;

use crate::abac::decision::{DecisionBuilder, Operation, PermissionResult, ReasonCode};
use crate::abac::engine::DecisionEngine;
use crate::context::AuthenticationContext;
use crate::error::AuthResult;
use crate::facet::{known, FacetRef};
use crate::types::EntityRef;

#[instrument(level = "debug", skip_all, fields(target = %target, facet = %facet, actor = ?ctx.user_id()))]
pub async fn can_assign(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	target: &EntityRef,
	facet: &FacetRef,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::FacetAssign, target);
	evaluate_change(engine, ctx, target, facet, &decision).await
}

#[instrument(level = "debug", skip_all, fields(target = %target, facet = %facet, actor = ?ctx.user_id()))]
pub async fn can_revoke(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	target: &EntityRef,
	facet: &FacetRef,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::FacetRevoke, target);
	evaluate_change(engine, ctx, target, facet, &decision).await
}

async fn evaluate_change(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	target: &EntityRef,
	facet: &FacetRef,
	decision: &DecisionBuilder,
) -> AuthResult<PermissionResult> {
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	let target_user = target.as_user();
	if target_user == Some(user_id) {
		return Ok(decision.deny(ReasonCode::SelfAssignment));
	}

	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}
	if known::is_delegable_to_scope_admin(facet.scope())
		&& engine
			.user_has_facet(user_id, &known::scope_admin(facet.scope()))
			.await?
	{
		return Ok(decision.grant(ReasonCode::ScopeAdmin));
	}

	if facet.scope() == known::DELEGABLE_SCOPE {
		if let Some(target_user) = target_user {
			if engine
				.relationships()
				.is_administrator_for(user_id, target_user, true)
				.await?
			{
				return Ok(decision.grant(ReasonCode::Manager));
			}
		}
	}

	Ok(decision.default_deny())
}

/// May the caller list the facets held by `target`?
#[instrument(level = "debug", skip_all, fields(target = %target, actor = ?ctx.user_id()))]
pub async fn can_view(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	target: &EntityRef,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::FacetView, target);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	let target_user = target.as_user();
	if target_user == Some(user_id) {
		return Ok(decision.grant(ReasonCode::Owner));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}
	if engine.user_has_facet(user_id, &known::support()).await? {
		return Ok(decision.grant(ReasonCode::Support));
	}
	if let Some(target_user) = target_user {
		if engine
			.relationships()
			.is_administrator_for(user_id, target_user, true)
			.await?
		{
			return Ok(decision.grant(ReasonCode::Manager));
		}
	}

	Ok(decision.default_deny())
}
