// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Facets: namespaced, time-bounded attributes attached to entities.

mod catalog;
pub mod known;
mod types;

pub use catalog::FacetCatalog;
pub use types::{
	AssignOptions, FacetAssignment, FacetDefinition, FacetHistoryEntry, FacetRef,
	FacetWithAssignment, HistoryAction, NewAssignment, DEFAULT_REVIEW_DAYS,
};
