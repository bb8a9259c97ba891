// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization tests entry point.
//!
//! Runs the decision engine, facet catalog and audit trail against SQLite.

mod authz;
