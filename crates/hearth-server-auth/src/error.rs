// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while evaluating or administering authorization.
///
/// Policy outcomes (including "not authenticated") are never errors; they are
/// denied [`crate::PermissionResult`]s. Errors are either configuration
/// mistakes or infrastructure failures, and the guard converts both into denials.
#[derive(Error, Debug)]
pub enum AuthError {
	#[error("invalid facet reference '{0}'")]
	InvalidFacetRef(String),

	#[error("facet '{0}' is not defined")]
	UndefinedFacet(String),

	#[error("invalid expiry: {0}")]
	InvalidExpiry(String),

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("permission check panicked: {0}")]
	Panicked(String),
}

impl AuthError {
	/// Returns true for errors caused by a programming or configuration mistake.
	pub fn is_configuration(&self) -> bool {
		matches!(
			self,
			AuthError::InvalidFacetRef(_) | AuthError::UndefinedFacet(_) | AuthError::InvalidExpiry(_)
		)
	}
}

/// Failure reported by a backing store behind one of the read interfaces.
#[derive(Error, Debug)]
pub enum StoreError {
	#[error("store unavailable: {0}")]
	Unavailable(String),

	#[error("corrupt record: {0}")]
	Corrupt(String),
}
