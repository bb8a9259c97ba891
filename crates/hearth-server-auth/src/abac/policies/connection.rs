// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connection request policies.

use tracing::instrument;

use crate::abac::decision::{DecisionBuilder, Operation, PermissionResult, ReasonCode};
use crate::abac::engine::DecisionEngine;
use crate::connection::ConnectionRequest;
use crate::context::AuthenticationContext;
use crate::error::AuthResult;
use crate::facet::known;
use crate::types::UserId;

/// May the caller send a connection request to `recipient_id`?
#[instrument(level = "debug", skip_all, fields(recipient = %recipient_id, actor = ?ctx.user_id()))]
pub async fn can_send(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	recipient_id: UserId,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::ConnectionSend, recipient_id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if user_id == recipient_id {
		return Ok(decision.deny(ReasonCode::SelfConnection));
	}

	let existing = engine
		.relationships()
		.connection_requests(user_id, recipient_id)
		.await?;
	if existing.iter().any(|r| r.is_accepted()) {
		return Ok(decision.deny(ReasonCode::AlreadyConnected));
	}
	if existing.iter().any(|r| r.is_pending()) {
		return Ok(decision.deny(ReasonCode::RequestPending));
	}

	Ok(decision.grant(ReasonCode::Authenticated))
}

/// May the caller accept or reject this request? Only its recipient can.
#[instrument(level = "debug", skip_all, fields(request_id = %request.id, actor = ?ctx.user_id()))]
pub async fn can_respond(
	_engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	request: &ConnectionRequest,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::ConnectionRespond, request.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if request.recipient_id != user_id {
		return Ok(decision.default_deny());
	}
	if !request.is_pending() {
		return Ok(decision.deny(ReasonCode::RequestNotPending));
	}

	Ok(decision.grant(ReasonCode::Participant))
}

/// May the caller withdraw this request? Only its sender can, while pending.
#[instrument(level = "debug", skip_all, fields(request_id = %request.id, actor = ?ctx.user_id()))]
pub async fn can_cancel(
	_engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	request: &ConnectionRequest,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::ConnectionCancel, request.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if request.requester_id != user_id {
		return Ok(decision.default_deny());
	}
	if !request.is_pending() {
		return Ok(decision.deny(ReasonCode::RequestNotPending));
	}

	Ok(decision.grant(ReasonCode::Owner))
}

#[instrument(level = "debug", skip_all, fields(request_id = %request.id, actor = ?ctx.user_id()))]
pub async fn can_view(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	request: &ConnectionRequest,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::ConnectionView, request.id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if request.involves(user_id) {
		return Ok(decision.grant(ReasonCode::Participant));
	}
	if engine.is_global_admin(user_id).await? {
		return Ok(decision.grant(ReasonCode::GlobalAdmin));
	}
	if engine.user_has_facet(user_id, &known::support()).await? {
		return Ok(decision.grant(ReasonCode::Support));
	}

	Ok(decision.default_deny())
}

/// May the caller drop an existing connection with `other_id`?
#[instrument(level = "debug", skip_all, fields(other = %other_id, actor = ?ctx.user_id()))]
pub async fn can_remove(
	engine: &DecisionEngine,
	ctx: &AuthenticationContext,
	other_id: UserId,
) -> AuthResult<PermissionResult> {
	let decision = DecisionBuilder::new(ctx, Operation::ConnectionRemove, other_id);
	let Some(user_id) = ctx.user_id() else {
		return Ok(decision.not_authenticated());
	};

	if user_id == other_id {
		return Ok(decision.deny(ReasonCode::SelfConnection));
	}
	if engine.relationships().is_friends_with(user_id, other_id).await? {
		return Ok(decision.grant(ReasonCode::Friends));
	}

	Ok(decision.default_deny())
}
