// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Facets the decision engine itself checks for.

use super::FacetRef;

pub const ROLE_SCOPE: &str = "role";
pub const RESTRICTION_SCOPE: &str = "restriction";
pub const CREATOR_SCOPE: &str = "creator";
pub const FACET_ADMIN_SCOPE: &str = "facet_admin";

/// Facets in this scope may be assigned by a manager to their (indirect) reports.
pub const DELEGABLE_SCOPE: &str = "team";

/// Scopes only a global admin may manage. A `facet_admin:<scope>` facet for
/// one of these grants nothing.
pub const ADMIN_ONLY_SCOPES: [&str; 2] = [ROLE_SCOPE, FACET_ADMIN_SCOPE];

/// Minimum `creator` hierarchy level required to publish paywalled content.
pub const PAYWALL_MIN_CREATOR_LEVEL: i32 = 2;

pub fn global_admin() -> FacetRef {
	FacetRef::new(ROLE_SCOPE, "global_admin")
}

pub fn content_moderator() -> FacetRef {
	FacetRef::new(ROLE_SCOPE, "content_moderator")
}

pub fn support() -> FacetRef {
	FacetRef::new(ROLE_SCOPE, "support")
}

pub fn posting_suspended() -> FacetRef {
	FacetRef::new(RESTRICTION_SCOPE, "posting_suspended")
}

/// Administrator of every facet in `scope`.
pub fn is_delegable_to_scope_admin(scope: &str) -> bool {
	!ADMIN_ONLY_SCOPES.contains(&scope)
}

pub fn scope_admin(scope: &str) -> FacetRef {
	FacetRef::new(FACET_ADMIN_SCOPE, scope)
}

/// Creator tier facet, e.g. `creator:tier:gold`.
pub fn creator_tier(tier: &str) -> FacetRef {
	FacetRef::new(CREATOR_SCOPE, "tier").with_value(tier)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn well_known_refs_render() {
		assert_eq!(global_admin().to_string(), "role:global_admin");
		assert_eq!(scope_admin("team").to_string(), "facet_admin:team");
		assert_eq!(creator_tier("gold").to_string(), "creator:tier:gold");
		assert_eq!(posting_suspended().to_string(), "restriction:posting_suspended");
	}

	#[test]
	fn privileged_scopes_stay_with_global_admins() {
		assert!(!is_delegable_to_scope_admin(ROLE_SCOPE));
		assert!(!is_delegable_to_scope_admin(FACET_ADMIN_SCOPE));
		assert!(is_delegable_to_scope_admin(CREATOR_SCOPE));
		assert!(is_delegable_to_scope_admin(DELEGABLE_SCOPE));
	}
}
