// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Facet catalog data model.
//!
//! - [`FacetRef`]: a parsed `scope:name[:value]` reference
//! - [`FacetDefinition`]: an immutable catalog entry
//! - [`FacetAssignment`]: a definition bound to an entity, possibly time-bounded
//! - [`FacetHistoryEntry`]: the append-only assign/revoke log
//!
//! Effectiveness of an assignment is always computed against a caller-supplied
//! instant; nothing here caches it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::types::{AssignmentId, EntityRef, FacetId, UserId};

/// Review interval used when a definition requires review but names no interval.
pub const DEFAULT_REVIEW_DAYS: i64 = 90;

const SEPARATOR: char = ':';

/// A reference to a facet by scope, name and optional value.
///
/// Parsed once at the boundary from the `scope:name[:value]` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FacetRef {
	scope: String,
	name: String,
	value: Option<String>,
}

impl FacetRef {
	pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			scope: scope.into(),
			name: name.into(),
			value: None,
		}
	}

	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}

	pub fn scope(&self) -> &str {
		&self.scope
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value(&self) -> Option<&str> {
		self.value.as_deref()
	}

	/// Returns true if this reference names exactly the given definition.
	pub fn identifies(&self, definition: &FacetDefinition) -> bool {
		self.scope == definition.scope
			&& self.name == definition.name
			&& self.value == definition.value
	}

	/// Returns true if a definition satisfies this reference.
	///
	/// A reference without a value matches every value of the same scope and name.
	pub fn matches(&self, definition: &FacetDefinition) -> bool {
		self.scope == definition.scope
			&& self.name == definition.name
			&& match &self.value {
				Some(v) => definition.value.as_deref() == Some(v.as_str()),
				None => true,
			}
	}
}

impl FromStr for FacetRef {
	type Err = AuthError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || AuthError::InvalidFacetRef(s.to_string());
		let parts: Vec<&str> = s.trim().split(SEPARATOR).collect();

		if parts
			.iter()
			.any(|p| p.is_empty() || p.chars().any(char::is_whitespace))
		{
			return Err(invalid());
		}

		match parts.as_slice() {
			[scope, name] => Ok(FacetRef::new(*scope, *name)),
			[scope, name, value] => Ok(FacetRef::new(*scope, *name).with_value(*value)),
			_ => Err(invalid()),
		}
	}
}

impl TryFrom<String> for FacetRef {
	type Error = AuthError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<FacetRef> for String {
	fn from(facet: FacetRef) -> Self {
		facet.to_string()
	}
}

impl fmt::Display for FacetRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.value {
			Some(value) => write!(f, "{}{SEPARATOR}{}{SEPARATOR}{}", self.scope, self.name, value),
			None => write!(f, "{}{SEPARATOR}{}", self.scope, self.name),
		}
	}
}

/// An immutable catalog entry. Unique per (scope, name, value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDefinition {
	pub id: FacetId,
	pub scope: String,
	pub name: String,
	pub value: Option<String>,
	pub description: Option<String>,
	/// Ordinal used to rank role-like facets within a scope.
	pub hierarchy_level: i32,
	pub requires_audit: bool,
	/// Default lifetime of an assignment, in days.
	pub expiry_days: Option<i64>,
	pub requires_review: bool,
	pub review_days: Option<i64>,
	pub created_at: DateTime<Utc>,
}

impl FacetDefinition {
	/// Creates a definition with level 0 and no expiry, review or audit requirement.
	pub fn new(facet: &FacetRef) -> Self {
		Self {
			id: FacetId::generate(),
			scope: facet.scope.clone(),
			name: facet.name.clone(),
			value: facet.value.clone(),
			description: None,
			hierarchy_level: 0,
			requires_audit: false,
			expiry_days: None,
			requires_review: false,
			review_days: None,
			created_at: Utc::now(),
		}
	}

	/// Builder: set the hierarchy level.
	pub fn with_level(mut self, level: i32) -> Self {
		self.hierarchy_level = level;
		self
	}

	/// Builder: set the default expiry.
	pub fn with_expiry_days(mut self, days: i64) -> Self {
		self.expiry_days = Some(days);
		self
	}

	/// Builder: require periodic review.
	pub fn with_review_days(mut self, days: i64) -> Self {
		self.requires_review = true;
		self.review_days = Some(days);
		self
	}

	/// Builder: mark assignments of this facet as audit-relevant.
	pub fn with_audit(mut self) -> Self {
		self.requires_audit = true;
		self
	}

	pub fn facet_ref(&self) -> FacetRef {
		FacetRef {
			scope: self.scope.clone(),
			name: self.name.clone(),
			value: self.value.clone(),
		}
	}

	/// The value to report for this facet: the explicit value, else the name.
	pub fn effective_value(&self) -> &str {
		self.value.as_deref().unwrap_or(&self.name)
	}

	/// Expiry implied by `expiry_days`, counted from `from`.
	///
	/// # Errors
	///
	/// [`AuthError::InvalidExpiry`] if the day count is negative or the date
	/// falls outside the representable range.
	pub fn default_expiry(&self, from: DateTime<Utc>) -> AuthResult<Option<DateTime<Utc>>> {
		self
			.expiry_days
			.map(|days| days_after(from, days, "expiry"))
			.transpose()
	}

	/// Next review date, or `None` when the facet does not require review.
	///
	/// # Errors
	///
	/// Same as [`Self::default_expiry`].
	pub fn review_at(&self, from: DateTime<Utc>) -> AuthResult<Option<DateTime<Utc>>> {
		if !self.requires_review {
			return Ok(None);
		}
		let days = self.review_days.unwrap_or(DEFAULT_REVIEW_DAYS);
		days_after(from, days, "review").map(Some)
	}
}

fn days_after(from: DateTime<Utc>, days: i64, what: &str) -> AuthResult<DateTime<Utc>> {
	if days < 0 {
		return Err(AuthError::InvalidExpiry(format!(
			"{what} interval of {days} days is negative"
		)));
	}
	Duration::try_days(days)
		.and_then(|interval| from.checked_add_signed(interval))
		.ok_or_else(|| {
			AuthError::InvalidExpiry(format!("{what} interval of {days} days is out of range"))
		})
}

/// A facet bound to an entity. At most one row exists per (facet, entity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetAssignment {
	pub id: AssignmentId,
	pub facet_id: FacetId,
	pub entity: EntityRef,
	pub is_active: bool,
	pub assigned_by: Option<UserId>,
	pub assigned_at: DateTime<Utc>,
	pub expires_at: Option<DateTime<Utc>>,
	pub review_at: Option<DateTime<Utc>>,
	pub reason: Option<String>,
	pub metadata: Option<serde_json::Value>,
}

impl FacetAssignment {
	/// Active and not yet expired at `now`.
	pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
		self.is_active && !self.is_expired_at(now)
	}

	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		self.expires_at.is_some_and(|at| at <= now)
	}

	pub fn needs_review_at(&self, now: DateTime<Utc>) -> bool {
		self.review_at.is_some_and(|at| at <= now)
	}
}

/// Input for creating or refreshing an assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
	pub facet_id: FacetId,
	pub entity: EntityRef,
	pub assigned_by: UserId,
	pub assigned_at: DateTime<Utc>,
	pub expires_at: Option<DateTime<Utc>>,
	pub review_at: Option<DateTime<Utc>>,
	pub reason: Option<String>,
	pub metadata: Option<serde_json::Value>,
}

/// Optional parameters for [`crate::FacetCatalog::assign`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignOptions {
	pub reason: Option<String>,
	/// Overrides the definition's default expiry.
	pub expires_at: Option<DateTime<Utc>>,
	pub metadata: Option<serde_json::Value>,
}

impl AssignOptions {
	pub fn reason(reason: impl Into<String>) -> Self {
		Self {
			reason: Some(reason.into()),
			..Default::default()
		}
	}

	pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
		self.expires_at = Some(at);
		self
	}

	pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
		self.metadata = Some(metadata);
		self
	}
}

/// What happened in a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
	Assigned,
	Revoked,
}

impl fmt::Display for HistoryAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HistoryAction::Assigned => write!(f, "ASSIGNED"),
			HistoryAction::Revoked => write!(f, "REVOKED"),
		}
	}
}

impl FromStr for HistoryAction {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"ASSIGNED" => Ok(HistoryAction::Assigned),
			"REVOKED" => Ok(HistoryAction::Revoked),
			other => Err(format!("unknown history action: {other}")),
		}
	}
}

/// An immutable record of one assign or revoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetHistoryEntry {
	pub id: Uuid,
	pub facet_id: FacetId,
	pub entity: EntityRef,
	pub action: HistoryAction,
	pub actor_id: UserId,
	pub reason: Option<String>,
	pub expires_at: Option<DateTime<Utc>>,
	pub metadata: Option<serde_json::Value>,
	pub created_at: DateTime<Utc>,
}

impl FacetHistoryEntry {
	pub fn assigned(assignment: &NewAssignment) -> Self {
		Self {
			id: Uuid::new_v4(),
			facet_id: assignment.facet_id,
			entity: assignment.entity,
			action: HistoryAction::Assigned,
			actor_id: assignment.assigned_by,
			reason: assignment.reason.clone(),
			expires_at: assignment.expires_at,
			metadata: assignment.metadata.clone(),
			created_at: assignment.assigned_at,
		}
	}

	pub fn revoked(
		facet_id: FacetId,
		entity: EntityRef,
		actor_id: UserId,
		reason: Option<String>,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			facet_id,
			entity,
			action: HistoryAction::Revoked,
			actor_id,
			reason,
			expires_at: None,
			metadata: None,
			created_at: Utc::now(),
		}
	}
}

/// An effective assignment together with its definition and review/expiry flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetWithAssignment {
	pub definition: FacetDefinition,
	pub assignment: FacetAssignment,
	pub is_expired: bool,
	pub needs_review: bool,
}
