// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Derived relationship facts: friendship and the management hierarchy.
//!
//! Nothing here is stored. Friendship comes from accepted connection requests;
//! management reachability is an online walk over the single-parent
//! "reports to" pointer. The pointer is externally mutable, so every walk is
//! iterative, bounded by [`MAX_HIERARCHY_DEPTH`] and guarded by a visited set.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::connection::ConnectionRequest;
use crate::error::AuthResult;
use crate::store::{ConnectionStore, UserDirectory};
use crate::types::UserId;
use crate::user::UserRecord;

/// Maximum number of hops followed in either direction of the hierarchy.
pub const MAX_HIERARCHY_DEPTH: usize = 10;

#[derive(Clone)]
pub struct RelationshipResolver {
	users: Arc<dyn UserDirectory>,
	connections: Arc<dyn ConnectionStore>,
}

impl RelationshipResolver {
	pub fn new(users: Arc<dyn UserDirectory>, connections: Arc<dyn ConnectionStore>) -> Self {
		Self { users, connections }
	}

	pub async fn get_user(&self, user_id: UserId) -> AuthResult<Option<UserRecord>> {
		Ok(self.users.get_user(user_id).await?)
	}

	/// Every connection request between `a` and `b`, newest first.
	pub async fn connection_requests(&self, a: UserId, b: UserId) -> AuthResult<Vec<ConnectionRequest>> {
		Ok(self.connections.requests_between(a, b).await?)
	}

	/// True iff a connection request between `a` and `b` has been accepted,
	/// in either direction.
	#[instrument(level = "debug", skip(self))]
	pub async fn is_friends_with(&self, a: UserId, b: UserId) -> AuthResult<bool> {
		if a == b {
			return Ok(false);
		}
		let requests = self.connections.requests_between(a, b).await?;
		Ok(requests.iter().any(|r| r.is_accepted()))
	}

	/// True iff `manager_id` is an ancestor of `subordinate_id`.
	///
	/// Nobody administers themselves. With `include_indirect` unset only the
	/// direct manager counts.
	#[instrument(level = "debug", skip(self))]
	pub async fn is_administrator_for(
		&self,
		manager_id: UserId,
		subordinate_id: UserId,
		include_indirect: bool,
	) -> AuthResult<bool> {
		if manager_id == subordinate_id {
			return Ok(false);
		}

		let mut visited = HashSet::from([subordinate_id]);
		let mut current = subordinate_id;

		for depth in 0..MAX_HIERARCHY_DEPTH {
			let Some(next) = self.users.manager_of(current).await? else {
				return Ok(false);
			};
			if next == manager_id {
				return Ok(true);
			}
			if !include_indirect {
				return Ok(false);
			}
			if !visited.insert(next) {
				warn!(user_id = %subordinate_id, at = %next, depth, "cycle in management chain");
				return Ok(false);
			}
			current = next;
		}

		Ok(false)
	}

	/// True iff `proposed_manager_id` already reports (transitively) to `user_id`,
	/// so making it `user_id`'s manager would close a loop.
	#[instrument(level = "debug", skip(self))]
	pub async fn check_for_circular_reference(
		&self,
		user_id: UserId,
		proposed_manager_id: UserId,
	) -> AuthResult<bool> {
		if user_id == proposed_manager_id {
			return Ok(true);
		}
		let reports = self.get_all_reports(user_id).await?;
		Ok(reports.contains(&proposed_manager_id))
	}

	pub async fn get_direct_reports(&self, manager_id: UserId) -> AuthResult<Vec<UserId>> {
		Ok(self.users.direct_reports(manager_id).await?)
	}

	/// Every transitive report of `manager_id`, breadth-first, de-duplicated,
	/// excluding `manager_id` itself.
	#[instrument(level = "debug", skip(self))]
	pub async fn get_all_reports(&self, manager_id: UserId) -> AuthResult<Vec<UserId>> {
		let mut seen = HashSet::from([manager_id]);
		let mut reports = Vec::new();
		let mut queue = VecDeque::from([(manager_id, 0usize)]);

		while let Some((current, depth)) = queue.pop_front() {
			if depth >= MAX_HIERARCHY_DEPTH {
				continue;
			}
			for report in self.users.direct_reports(current).await? {
				if seen.insert(report) {
					reports.push(report);
					queue.push_back((report, depth + 1));
				}
			}
		}

		Ok(reports)
	}
}
