// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fail-closed invocation and composition of policy functions.
//!
//! [`safe_permission_check`] is how callers run a policy: any error or panic
//! inside the check becomes a `PERMISSION_CHECK_ERROR` denial, never an
//! ambiguous failure.

use chrono::Utc;
use futures::future::{join_all, FutureExt};
use serde_json::json;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use super::decision::{Decision, DecisionBuilder, Operation, PermissionResult, ReasonCode};
use crate::context::AuthenticationContext;
use crate::error::{AuthError, AuthResult};

/// Runs a policy check, converting any failure into a denial.
///
/// `fallback` describes the operation being checked; it is only used to build
/// the denial when `check` fails or panics.
pub async fn safe_permission_check<F>(check: F, fallback: DecisionBuilder) -> PermissionResult
where
	F: Future<Output = AuthResult<PermissionResult>>,
{
	let error = match AssertUnwindSafe(check).catch_unwind().await {
		Ok(Ok(result)) => {
			debug!(
				operation = %result.operation(),
				granted = result.is_granted(),
				reason_code = %result.reason_code(),
				"permission decided"
			);
			return result;
		}
		Ok(Err(err)) => err,
		Err(panic) => AuthError::Panicked(panic_message(panic.as_ref())),
	};

	warn!(
		operation = %fallback.operation(),
		error = %error,
		configuration = error.is_configuration(),
		"permission check failed, denying"
	);

	fallback
		.deny(ReasonCode::PermissionCheckError)
		.with_metadata(json!({
			"error": error.to_string(),
			"configuration": error.is_configuration(),
		}))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"unknown panic".to_string()
	}
}

/// The denial returned when there is nothing to combine.
fn empty_composite() -> PermissionResult {
	let code = ReasonCode::DefaultDeny;
	PermissionResult::Denied(Decision {
		actor_id: None,
		resource_id: None,
		operation: Operation::Composite,
		reason: "No permission results to combine".to_string(),
		reason_code: code,
		metadata: None,
		timestamp: Utc::now(),
	})
}

/// All-of: the first denial, or else the first grant.
pub fn require_all<I>(results: I) -> PermissionResult
where
	I: IntoIterator<Item = PermissionResult>,
{
	let mut first_grant = None;
	for result in results {
		if !result.is_granted() {
			return result;
		}
		first_grant.get_or_insert(result);
	}
	first_grant.unwrap_or_else(empty_composite)
}

/// Any-of: the first grant, or else the first denial.
pub fn require_any<I>(results: I) -> PermissionResult
where
	I: IntoIterator<Item = PermissionResult>,
{
	let mut first_denial = None;
	for result in results {
		if result.is_granted() {
			return result;
		}
		first_denial.get_or_insert(result);
	}
	first_denial.unwrap_or_else(empty_composite)
}

/// Keeps the items the caller may act on, in their original order.
///
/// Every check runs concurrently and through [`safe_permission_check`], so a
/// failing item is dropped without affecting the others.
pub async fn filter_by_permission<'a, T, F, Fut>(
	items: &'a [T],
	ctx: &'a AuthenticationContext,
	operation: Operation,
	check: F,
) -> Vec<&'a T>
where
	F: Fn(&'a T, &'a AuthenticationContext) -> Fut,
	Fut: Future<Output = AuthResult<PermissionResult>>,
{
	let checks = items.iter().map(|item| {
		safe_permission_check(check(item, ctx), DecisionBuilder::unscoped(ctx, operation))
	});
	let results = join_all(checks).await;

	items
		.iter()
		.zip(results)
		.filter(|(_, result)| result.is_granted())
		.map(|(item, _)| item)
		.collect()
}
