// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute-based access control.
//!
//! - [`DecisionEngine`]: facet catalog, relationship resolver and community store
//! - [`policies`]: one module per resource kind, one function per operation
//! - [`guard`]: fail-closed invocation and result composition

mod decision;
mod engine;
pub mod guard;
pub mod policies;
mod types;

pub use decision::{Decision, DecisionBuilder, Operation, PermissionResult, ReasonCode};
pub use engine::DecisionEngine;
pub use guard::{filter_by_permission, require_all, require_any, safe_permission_check};
pub use types::{CommentAttrs, CommunityPostAttrs, ContentAttrs};
