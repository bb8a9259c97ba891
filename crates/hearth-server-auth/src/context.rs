// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-request authentication context.
//!
//! An [`AuthenticationContext`] is built once per inbound call by the transport
//! layer and then only borrowed immutably by every decision function. It carries
//! the caller (if any) plus request metadata that ends up in the audit trail.

use serde::{Deserialize, Serialize};

use crate::types::UserId;
use crate::user::UserRecord;

/// Request metadata recorded alongside every decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
	pub request_id: Option<String>,
	pub session_id: Option<String>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}

/// Who is calling, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationContext {
	user: Option<UserRecord>,
	request: RequestMetadata,
}

impl AuthenticationContext {
	/// A context with no caller.
	pub fn anonymous() -> Self {
		Self {
			user: None,
			request: RequestMetadata::default(),
		}
	}

	/// A context for a resolved caller.
	pub fn authenticated(user: UserRecord) -> Self {
		Self {
			user: Some(user),
			request: RequestMetadata::default(),
		}
	}

	/// Builder: set the request id.
	pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
		self.request.request_id = Some(request_id.into());
		self
	}

	/// Builder: set the session id.
	pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
		self.request.session_id = Some(session_id.into());
		self
	}

	/// Builder: set the client address.
	pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
		self.request.ip_address = Some(ip_address.into());
		self
	}

	/// Builder: set the user agent.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.request.user_agent = Some(user_agent.into());
		self
	}

	pub fn user_id(&self) -> Option<UserId> {
		self.user.as_ref().map(|u| u.id)
	}

	pub fn user(&self) -> Option<&UserRecord> {
		self.user.as_ref()
	}

	pub fn is_authenticated(&self) -> bool {
		self.user.is_some()
	}

	/// Returns true if the caller is the given user.
	pub fn is_user(&self, user_id: UserId) -> bool {
		self.user_id() == Some(user_id)
	}

	pub fn request(&self) -> &RequestMetadata {
		&self.request
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn anonymous_context_has_no_caller() {
		let ctx = AuthenticationContext::anonymous();
		assert!(!ctx.is_authenticated());
		assert_eq!(ctx.user_id(), None);
		assert!(!ctx.is_user(UserId::generate()));
	}

	#[test]
	fn authenticated_context_carries_metadata() {
		let user = UserRecord::new(UserId::generate(), "alice");
		let user_id = user.id;
		let ctx = AuthenticationContext::authenticated(user)
			.with_request_id("req-1")
			.with_session_id("sess-1")
			.with_ip_address("10.0.0.1")
			.with_user_agent("curl/8");

		assert!(ctx.is_user(user_id));
		assert_eq!(ctx.request().request_id.as_deref(), Some("req-1"));
		assert_eq!(ctx.request().session_id.as_deref(), Some("sess-1"));
		assert_eq!(ctx.request().ip_address.as_deref(), Some("10.0.0.1"));
		assert_eq!(ctx.request().user_agent.as_deref(), Some("curl/8"));
	}
}
