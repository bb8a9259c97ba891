// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission audit configuration section.

use serde::{Deserialize, Serialize};

const DEFAULT_QUEUE_CAPACITY: usize = 10000;

fn default_queue_capacity() -> usize {
	DEFAULT_QUEUE_CAPACITY
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfigLayer {
	pub enabled: Option<bool>,
	pub asynchronous: Option<bool>,
	pub queue_capacity: Option<usize>,
	pub spill_path: Option<String>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.asynchronous.is_some() {
			self.asynchronous = other.asynchronous;
		}
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		if other.spill_path.is_some() {
			self.spill_path = other.spill_path;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		AuditConfig {
			enabled: self.enabled.unwrap_or(true),
			asynchronous: self.asynchronous.unwrap_or(true),
			queue_capacity: self.queue_capacity.unwrap_or_else(default_queue_capacity),
			spill_path: self.spill_path,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
	/// Record permission decisions at all.
	pub enabled: bool,
	/// Publish to the in-process queue first, falling back to a direct write.
	pub asynchronous: bool,
	/// Bound on queued, not yet persisted records.
	pub queue_capacity: usize,
	/// JSON lines file for records the drain could not persist.
	pub spill_path: Option<String>,
}

impl Default for AuditConfig {
	fn default() -> Self {
		AuditConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn defaults() {
		let config = AuditConfig::default();
		assert!(config.enabled);
		assert!(config.asynchronous);
		assert_eq!(config.queue_capacity, 10000);
		assert_eq!(config.spill_path, None);
	}

	fn layer() -> impl Strategy<Value = AuditConfigLayer> {
		(
			proptest::option::of(any::<bool>()),
			proptest::option::of(any::<bool>()),
			proptest::option::of(1usize..100_000),
			proptest::option::of("[a-z/]{1,16}"),
		)
			.prop_map(|(enabled, asynchronous, queue_capacity, spill_path)| AuditConfigLayer {
				enabled,
				asynchronous,
				queue_capacity,
				spill_path,
			})
	}

	proptest! {
		#[test]
		fn merge_prefers_the_overlay_when_set(base in layer(), overlay in layer()) {
			let mut merged = base.clone();
			merged.merge(overlay.clone());
			prop_assert_eq!(merged.enabled, overlay.enabled.or(base.enabled));
			prop_assert_eq!(merged.asynchronous, overlay.asynchronous.or(base.asynchronous));
			prop_assert_eq!(merged.queue_capacity, overlay.queue_capacity.or(base.queue_capacity));
			prop_assert_eq!(merged.spill_path, overlay.spill_path.or(base.spill_path));
		}
	}
}
