// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Hearth authorization services.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`HEARTH_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use hearth_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("audit enabled: {}", config.audit.enabled);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub audit: AuditConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`HEARTH_SERVER_*`)
/// 2. Config file (`/etc/hearth/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	load_from(vec![Box::new(EnvSource)])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let audit = layer.audit.unwrap_or_default().finalize();

	validate_config(&audit)?;

	info!(
		database = %database.url,
		log_level = %logging.level,
		audit_enabled = audit.enabled,
		audit_asynchronous = audit.asynchronous,
		audit_queue_capacity = audit.queue_capacity,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		logging,
		audit,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(audit: &AuditConfig) -> Result<(), ConfigError> {
	if audit.enabled && audit.asynchronous && audit.queue_capacity == 0 {
		return Err(ConfigError::Validation(
			"HEARTH_SERVER_AUDIT_QUEUE_CAPACITY must be at least 1 when asynchronous audit is enabled"
				.to_string(),
		));
	}

	Ok(())
}
