// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only JSON lines spill file.
//!
//! Holds records the queue drain could not hand to the database, so an
//! operator can replay them later.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::AuditSinkError;
use crate::event::PermissionAuditRecord;
use crate::sink::AuditSink;

pub struct FileAuditSink {
	path: PathBuf,
	file: Mutex<Option<File>>,
}

impl FileAuditSink {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			file: Mutex::new(None),
		}
	}

	pub fn path(&self) -> &std::path::Path {
		&self.path
	}
}

pub fn format_json_line(record: &PermissionAuditRecord) -> Result<String, AuditSinkError> {
	let json = serde_json::to_string(record)
		.map_err(|e| AuditSinkError::Permanent(format!("JSON serialization failed: {e}")))?;
	Ok(format!("{json}\n"))
}

#[async_trait]
impl AuditSink for FileAuditSink {
	fn name(&self) -> &str {
		"file"
	}

	async fn publish(&self, record: Arc<PermissionAuditRecord>) -> Result<(), AuditSinkError> {
		let line = format_json_line(&record)?;

		let mut guard = self.file.lock().await;
		if guard.is_none() {
			let file = OpenOptions::new()
				.create(true)
				.append(true)
				.open(&self.path)
				.await
				.map_err(|e| AuditSinkError::Transient(format!("failed to open file: {e}")))?;
			*guard = Some(file);
		}
		let file = guard
			.as_mut()
			.ok_or_else(|| AuditSinkError::Permanent("file handle not initialized".to_string()))?;

		file
			.write_all(line.as_bytes())
			.await
			.map_err(|e| AuditSinkError::Transient(format!("failed to write to file: {e}")))?;
		file
			.sync_data()
			.await
			.map_err(|e| AuditSinkError::Transient(format!("failed to sync file: {e}")))?;

		Ok(())
	}
}
