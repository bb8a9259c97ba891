// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-resource policy functions.
//!
//! Call them through [`crate::safe_permission_check`] so that a failing lookup
//! denies instead of surfacing an error.

pub mod comment;
pub mod community;
pub mod connection;
pub mod content;
pub mod facet_admin;
