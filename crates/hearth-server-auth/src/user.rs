// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User records as seen by the authorization core.
//!
//! The canonical user data lives elsewhere; this is the read-only projection the
//! decision engine needs: identity, the single "reports to" pointer and the
//! division the user belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DivisionId, UserId};

/// Read-only projection of a platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
	pub id: UserId,
	pub display_name: String,
	/// The user this user reports to, if any.
	pub manager_id: Option<UserId>,
	pub division_id: Option<DivisionId>,
	pub is_active: bool,
	pub created_at: DateTime<Utc>,
}

impl UserRecord {
	/// Creates an active user with no manager and no division.
	pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
		Self {
			id,
			display_name: display_name.into(),
			manager_id: None,
			division_id: None,
			is_active: true,
			created_at: Utc::now(),
		}
	}

	/// Builder: set the manager.
	pub fn with_manager(mut self, manager_id: UserId) -> Self {
		self.manager_id = Some(manager_id);
		self
	}

	/// Builder: set the division.
	pub fn with_division(mut self, division_id: DivisionId) -> Self {
		self.division_id = Some(division_id);
		self
	}

	/// Returns true if both users belong to the same (known) division.
	pub fn shares_division_with(&self, other: &UserRecord) -> bool {
		matches!((self.division_id, other.division_id), (Some(a), Some(b)) if a == b)
	}
}
