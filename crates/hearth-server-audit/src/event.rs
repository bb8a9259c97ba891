// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The structured record written for every audited permission decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hearth_server_auth::{AuthenticationContext, PermissionResult, UserId};

/// One permission decision as it lands in the audit trail.
///
/// Records are append-only. The same decision may be stored twice when the
/// queue accepted it and the drain later raced a fallback write; `id` lets
/// readers collapse such duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionAuditRecord {
	pub id: Uuid,
	/// When the decision was made, not when it was persisted.
	pub timestamp: DateTime<Utc>,
	pub actor_user_id: Option<UserId>,
	pub resource_type: String,
	pub resource_id: Option<String>,
	pub operation: String,
	pub granted: bool,
	pub reason: String,
	pub reason_code: String,
	pub metadata: Option<serde_json::Value>,
	pub request_id: Option<String>,
	pub session_id: Option<String>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}

impl PermissionAuditRecord {
	pub fn from_decision(
		result: &PermissionResult,
		ctx: &AuthenticationContext,
		resource_type: impl Into<String>,
	) -> Self {
		let decision = result.decision();
		let request = ctx.request();
		Self {
			id: Uuid::new_v4(),
			timestamp: decision.timestamp,
			actor_user_id: decision.actor_id.or_else(|| ctx.user_id()),
			resource_type: resource_type.into(),
			resource_id: decision.resource_id.clone(),
			operation: decision.operation.to_string(),
			granted: result.is_granted(),
			reason: decision.reason.clone(),
			reason_code: decision.reason_code.to_string(),
			metadata: decision.metadata.clone(),
			request_id: request.request_id.clone(),
			session_id: request.session_id.clone(),
			ip_address: request.ip_address.clone(),
			user_agent: request.user_agent.clone(),
		}
	}
}
