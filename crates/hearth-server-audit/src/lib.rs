// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit trail for permission decisions.
//!
//! Every decision can be recorded through [`PermissionAuditor`]. Delivery is
//! two-tier: an in-process queue drained into SQLite, and a direct SQLite
//! write whenever the queue refuses a record. Duplicates are possible during
//! partial failures; lost records are not.

pub mod error;
pub mod event;
pub mod pipeline;
pub mod sink;

pub use error::{AuditError, AuditResult, AuditSinkError};
pub use event::PermissionAuditRecord;
pub use pipeline::{AuditDelivery, AuditOptions, PermissionAuditor};
pub use sink::fallback::{DeliveryTier, FallbackAuditSink};
pub use sink::file::FileAuditSink;
pub use sink::queue::{DrainHandle, QueueAuditSink, QueueDrain, RetryPolicy};
pub use sink::AuditSink;

pub use hearth_server_config::AuditConfig;

#[cfg(feature = "sink-sqlite")]
pub use sink::sqlite::SqliteAuditSink;
