// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Hearth authorization operator CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{AuditCommands, FacetCommands, UserCommands};

#[derive(Parser, Debug)]
#[command(
	name = "hearth-authz",
	about = "Inspect and manage Hearth facets, reporting lines and audit records",
	version
)]
struct Args {
	/// Config file to layer between defaults and environment
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create or upgrade the database schema
	Migrate,
	/// Manage users and reporting lines
	#[command(subcommand)]
	User(UserCommands),
	/// Manage facet definitions and assignments
	#[command(subcommand)]
	Facet(FacetCommands),
	/// List everyone reporting to a user
	Reports(commands::ReportsArgs),
	/// Query the permission audit trail
	#[command(subcommand)]
	Audit(AuditCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => hearth_server_config::load_config_with_file(path)?,
		None => hearth_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	tracing::debug!(database = %config.database.url, "opening database");
	let pool = hearth_server_db::create_pool(&config.database.url).await?;

	let ctx = match args.command {
		Command::Migrate => {
			hearth_server_db::run_migrations(&pool).await?;
			println!("schema is up to date");
			return Ok(());
		}
		_ => commands::CliContext::new(pool, &config)?,
	};

	let outcome = match args.command {
		Command::Migrate => Ok(()),
		Command::User(cmd) => commands::handle_user(cmd, &ctx).await,
		Command::Facet(cmd) => commands::handle_facet(cmd, &ctx).await,
		Command::Reports(reports) => commands::handle_reports(reports, &ctx).await,
		Command::Audit(cmd) => commands::handle_audit(cmd, &ctx).await,
	};
	ctx.auditor.shutdown().await;
	outcome
}
