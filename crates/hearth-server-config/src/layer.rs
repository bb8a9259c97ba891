// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by a single source.

use serde::Deserialize;

use crate::sections::{AuditConfigLayer, DatabaseConfigLayer, LoggingConfigLayer};

/// One source's view of the configuration. Every section is optional so that
/// a later source only overrides what it actually sets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub audit: Option<AuditConfigLayer>,
}

impl ServerConfigLayer {
	/// Overlay `other` on top of `self`, field by field.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		if let Some(database) = other.database {
			self.database.get_or_insert_with(Default::default).merge(database);
		}
		if let Some(logging) = other.logging {
			self.logging.get_or_insert_with(Default::default).merge(logging);
		}
		if let Some(audit) = other.audit {
			self.audit.get_or_insert_with(Default::default).merge(audit);
		}
	}
}
