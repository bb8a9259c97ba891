// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connection (friend) requests.
//!
//! Friendship is never stored directly: two users are friends when a request
//! between them, in either direction, has reached [`ConnectionStatus::Accepted`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConnectionRequestId, ConnectionStatus, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
	pub id: ConnectionRequestId,
	pub requester_id: UserId,
	pub recipient_id: UserId,
	pub status: ConnectionStatus,
	pub created_at: DateTime<Utc>,
	pub responded_at: Option<DateTime<Utc>>,
}

impl ConnectionRequest {
	/// Creates a pending request.
	pub fn new(requester_id: UserId, recipient_id: UserId) -> Self {
		Self {
			id: ConnectionRequestId::generate(),
			requester_id,
			recipient_id,
			status: ConnectionStatus::Pending,
			created_at: Utc::now(),
			responded_at: None,
		}
	}

	/// Builder: set the status.
	pub fn with_status(mut self, status: ConnectionStatus) -> Self {
		if status != ConnectionStatus::Pending {
			self.responded_at = Some(Utc::now());
		}
		self.status = status;
		self
	}

	pub fn is_pending(&self) -> bool {
		self.status == ConnectionStatus::Pending
	}

	pub fn is_accepted(&self) -> bool {
		self.status == ConnectionStatus::Accepted
	}

	/// Returns true if `user_id` sent or received this request.
	pub fn involves(&self, user_id: UserId) -> bool {
		self.requester_id == user_id || self.recipient_id == user_id
	}

	/// Returns true if this request links `a` and `b`, in either direction.
	pub fn connects(&self, a: UserId, b: UserId) -> bool {
		(self.requester_id == a && self.recipient_id == b)
			|| (self.requester_id == b && self.recipient_id == a)
	}
}
