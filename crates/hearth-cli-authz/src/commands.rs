// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::{anyhow, bail, Context};
use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use hearth_server_audit::{AuditConfig, PermissionAuditor};
use hearth_server_auth::{
	policies::facet_admin, AssignOptions, AuthenticationContext, DecisionBuilder, DecisionEngine,
	DivisionId, EntityRef, FacetDefinition, FacetRef, Operation, UserId, UserRecord,
};
use hearth_server_config::ServerConfig;
use hearth_server_db::{AuditQuery, AuditRepository, FacetRepository, UserRepository};
use sqlx::sqlite::SqlitePool;
use tracing::{instrument, warn};

#[derive(Debug, Subcommand)]
pub enum UserCommands {
	/// Register a user
	Add(UserAddArgs),
	/// Change who a user reports to
	SetManager(SetManagerArgs),
	/// Show a stored user
	Show {
		user: UserId,
	},
}

#[derive(Debug, Clone, Args)]
pub struct UserAddArgs {
	pub display_name: String,

	/// Use this id instead of generating one
	#[arg(long)]
	pub id: Option<UserId>,

	#[arg(long)]
	pub manager: Option<UserId>,

	#[arg(long)]
	pub division: Option<DivisionId>,
}

#[derive(Debug, Clone, Args)]
pub struct SetManagerArgs {
	pub user: UserId,

	/// New manager; omit to clear
	pub manager: Option<UserId>,
}

#[derive(Debug, Subcommand)]
pub enum FacetCommands {
	/// Add a facet to the catalog
	Define(DefineArgs),
	/// List catalog entries
	Definitions {
		#[arg(long)]
		scope: Option<String>,
	},
	/// Grant a facet to a user
	Assign(AssignArgs),
	/// Take a facet away from a user
	Revoke(RevokeArgs),
	/// Effective facets held by a user
	List {
		user: UserId,
		#[arg(long)]
		scope: Option<String>,
	},
	/// Exit status reports whether a user holds a facet
	Has {
		user: UserId,
		facet: FacetRef,
	},
	/// Assignment history for a user
	History {
		user: UserId,
		#[arg(long)]
		facet: Option<FacetRef>,
	},
}

#[derive(Debug, Clone, Args)]
pub struct DefineArgs {
	/// `scope:name` or `scope:name:value`
	pub facet: FacetRef,

	#[arg(long)]
	pub description: Option<String>,

	#[arg(long, default_value_t = 0)]
	pub level: i32,

	/// Default lifetime of an assignment
	#[arg(long)]
	pub expiry_days: Option<i64>,

	#[arg(long)]
	pub review_days: Option<i64>,

	/// Log assignments and revocations at info level
	#[arg(long)]
	pub audit: bool,
}

#[derive(Debug, Clone, Args)]
pub struct AssignArgs {
	pub user: UserId,
	pub facet: FacetRef,

	/// Acting user; must be allowed to assign the facet
	#[arg(long)]
	pub by: UserId,

	#[arg(long)]
	pub reason: Option<String>,

	#[arg(long)]
	pub expires_in_days: Option<i64>,

	/// Skip the permission check, for seeding the first administrator
	#[arg(long)]
	pub bootstrap: bool,
}

#[derive(Debug, Clone, Args)]
pub struct RevokeArgs {
	pub user: UserId,
	pub facet: FacetRef,

	#[arg(long)]
	pub by: UserId,

	#[arg(long)]
	pub reason: Option<String>,

	#[arg(long)]
	pub bootstrap: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ReportsArgs {
	pub user: UserId,

	/// Include indirect reports
	#[arg(long)]
	pub all: bool,
}

#[derive(Debug, Subcommand)]
pub enum AuditCommands {
	/// Most recent audit records
	Tail(TailArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TailArgs {
	#[arg(long)]
	pub actor: Option<UserId>,

	#[arg(long)]
	pub resource_type: Option<String>,

	#[arg(long)]
	pub resource_id: Option<String>,

	/// Operation name such as `content.read`
	#[arg(long)]
	pub operation: Option<String>,

	#[arg(long, conflicts_with = "denied")]
	pub granted: bool,

	#[arg(long)]
	pub denied: bool,

	#[arg(long, default_value_t = 20)]
	pub limit: i64,
}

impl TailArgs {
	fn to_query(&self) -> AuditQuery {
		let granted = match (self.granted, self.denied) {
			(true, _) => Some(true),
			(_, true) => Some(false),
			_ => None,
		};
		AuditQuery {
			actor_id: self.actor,
			resource_type: self.resource_type.clone(),
			resource_id: self.resource_id.clone(),
			operation: self.operation.clone(),
			granted,
			limit: Some(self.limit),
			..Default::default()
		}
	}
}

pub struct CliContext {
	pub engine: DecisionEngine,
	pub users: UserRepository,
	pub facets: FacetRepository,
	pub audit: AuditRepository,
	pub auditor: PermissionAuditor,
}

impl CliContext {
	pub fn new(pool: SqlitePool, config: &ServerConfig) -> anyhow::Result<Self> {
		// The process exits right after one command, so nothing may be left queued.
		let audit = AuditConfig {
			asynchronous: false,
			..config.audit.clone()
		};
		Ok(Self {
			engine: hearth_server_db::decision_engine(&pool),
			users: UserRepository::new(pool.clone()),
			facets: FacetRepository::new(pool.clone()),
			audit: AuditRepository::new(pool.clone()),
			auditor: PermissionAuditor::sqlite(pool, &audit)?,
		})
	}

	async fn acting_as(&self, user_id: UserId) -> anyhow::Result<AuthenticationContext> {
		let record = self
			.users
			.get_user(user_id)
			.await?
			.ok_or_else(|| anyhow!("no such user: {user_id}"))?;
		Ok(AuthenticationContext::authenticated(record)
			.with_user_agent(concat!("hearth-authz/", env!("CARGO_PKG_VERSION"))))
	}

	/// Runs `operation`'s facet policy for `actor` and fails unless granted.
	async fn authorize_facet_change(
		&self,
		actor: &AuthenticationContext,
		operation: Operation,
		target: &EntityRef,
		facet: &FacetRef,
	) -> anyhow::Result<()> {
		let fallback = DecisionBuilder::new(actor, operation, target);
		let result = match operation {
			Operation::FacetRevoke => {
				self
					.auditor
					.check_and_audit(actor, fallback, facet_admin::can_revoke(&self.engine, actor, target, facet))
					.await
			}
			_ => {
				self
					.auditor
					.check_and_audit(actor, fallback, facet_admin::can_assign(&self.engine, actor, target, facet))
					.await
			}
		};
		if !result.is_granted() {
			bail!("{} denied: {} ({})", operation, result.reason(), result.reason_code());
		}
		Ok(())
	}
}

#[instrument(skip(ctx))]
pub async fn handle_user(cmd: UserCommands, ctx: &CliContext) -> anyhow::Result<()> {
	match cmd {
		UserCommands::Add(args) => {
			let mut record = UserRecord::new(args.id.unwrap_or_else(UserId::generate), args.display_name);
			if let Some(manager) = args.manager {
				record = record.with_manager(manager);
			}
			if let Some(division) = args.division {
				record = record.with_division(division);
			}
			ctx.users.upsert_user(&record).await?;
			println!("{}", record.id);
		}
		UserCommands::SetManager(args) => {
			if let Some(manager) = args.manager {
				if ctx
					.engine
					.relationships()
					.check_for_circular_reference(args.user, manager)
					.await?
				{
					bail!("{manager} already reports to {}; refusing to create a cycle", args.user);
				}
			}
			ctx.users
				.set_manager(args.user, args.manager)
				.await
				.with_context(|| format!("updating manager of {}", args.user))?;
		}
		UserCommands::Show { user } => {
			let record = ctx
				.users
				.get_user(user)
				.await?
				.ok_or_else(|| anyhow!("no such user: {user}"))?;
			println!("id:       {}", record.id);
			println!("name:     {}", record.display_name);
			println!("active:   {}", record.is_active);
			if let Some(manager) = record.manager_id {
				println!("manager:  {manager}");
			}
			if let Some(division) = record.division_id {
				println!("division: {division}");
			}
		}
	}
	Ok(())
}

#[instrument(skip(ctx))]
pub async fn handle_facet(cmd: FacetCommands, ctx: &CliContext) -> anyhow::Result<()> {
	let catalog = ctx.engine.facets();
	match cmd {
		FacetCommands::Define(args) => {
			let mut definition = FacetDefinition::new(&args.facet).with_level(args.level);
			definition.description = args.description;
			if let Some(days) = args.expiry_days {
				definition = definition.with_expiry_days(days);
			}
			if let Some(days) = args.review_days {
				definition = definition.with_review_days(days);
			}
			if args.audit {
				definition = definition.with_audit();
			}
			ctx.facets.create_definition(&definition).await?;
			println!("{}\t{}", definition.id, definition.facet_ref());
		}
		FacetCommands::Definitions { scope } => {
			for definition in ctx.facets.list_definitions(scope.as_deref()).await? {
				println!(
					"{}\tlevel {}\t{}",
					definition.facet_ref(),
					definition.hierarchy_level,
					definition.description.as_deref().unwrap_or("")
				);
			}
		}
		FacetCommands::Assign(args) => {
			let target = EntityRef::user(args.user);
			if args.bootstrap {
				warn!(facet = %args.facet, user = %args.user, "assigning without a permission check");
			} else {
				let actor = ctx.acting_as(args.by).await?;
				ctx.authorize_facet_change(&actor, Operation::FacetAssign, &target, &args.facet)
					.await?;
			}

			let mut options = AssignOptions {
				reason: args.reason,
				..Default::default()
			};
			if let Some(days) = args.expires_in_days {
				options = options.expiring_at(Utc::now() + Duration::days(days));
			}
			let assignment = catalog.assign(&args.facet, &target, args.by, options).await?;
			match assignment.expires_at {
				Some(at) => println!("assigned {} to {} until {at}", args.facet, args.user),
				None => println!("assigned {} to {}", args.facet, args.user),
			}
		}
		FacetCommands::Revoke(args) => {
			let target = EntityRef::user(args.user);
			if args.bootstrap {
				warn!(facet = %args.facet, user = %args.user, "revoking without a permission check");
			} else {
				let actor = ctx.acting_as(args.by).await?;
				ctx.authorize_facet_change(&actor, Operation::FacetRevoke, &target, &args.facet)
					.await?;
			}

			if catalog.revoke(&args.facet, &target, args.by, args.reason).await? {
				println!("revoked {} from {}", args.facet, args.user);
			} else {
				println!("{} did not hold {}", args.user, args.facet);
			}
		}
		FacetCommands::List { user, scope } => {
			let facets = catalog
				.get_facets(&EntityRef::user(user), scope.as_deref())
				.await?;
			for facet in facets {
				let expires = facet
					.assignment
					.expires_at
					.map(|at| at.to_rfc3339())
					.unwrap_or_else(|| "never".to_string());
				println!(
					"{}\tsince {}\texpires {}{}",
					facet.definition.facet_ref(),
					facet.assignment.assigned_at.to_rfc3339(),
					expires,
					if facet.needs_review { "\tneeds review" } else { "" }
				);
			}
		}
		FacetCommands::Has { user, facet } => {
			let held = catalog.has_facet(&EntityRef::user(user), &facet).await?;
			println!("{held}");
			if !held {
				std::process::exit(1);
			}
		}
		FacetCommands::History { user, facet } => {
			let entries = catalog
				.list_history(&EntityRef::user(user), facet.as_ref())
				.await?;
			for entry in entries {
				println!(
					"{}\t{}\t{}\tby {}\t{}",
					entry.created_at.to_rfc3339(),
					entry.action,
					entry.facet_id,
					entry.actor_id,
					entry.reason.as_deref().unwrap_or("")
				);
			}
		}
	}
	Ok(())
}

#[instrument(skip(ctx))]
pub async fn handle_reports(args: ReportsArgs, ctx: &CliContext) -> anyhow::Result<()> {
	let resolver = ctx.engine.relationships();
	let reports = if args.all {
		resolver.get_all_reports(args.user).await?
	} else {
		resolver.get_direct_reports(args.user).await?
	};

	for report in reports {
		let name = resolver
			.get_user(report)
			.await?
			.map(|u| u.display_name)
			.unwrap_or_default();
		println!("{report}\t{name}");
	}
	Ok(())
}

#[instrument(skip(ctx))]
pub async fn handle_audit(cmd: AuditCommands, ctx: &CliContext) -> anyhow::Result<()> {
	match cmd {
		AuditCommands::Tail(args) => {
			let (records, total) = ctx.audit.query(&args.to_query()).await?;
			for record in &records {
				let actor = record
					.actor_user_id
					.map(|id| id.to_string())
					.unwrap_or_else(|| "anonymous".to_string());
				println!(
					"{}\t{}\t{}\t{}/{}\t{}\t{}",
					record.timestamp.to_rfc3339(),
					if record.granted { "GRANTED" } else { "DENIED" },
					record.operation,
					record.resource_type,
					record.resource_id.as_deref().unwrap_or("-"),
					actor,
					record.reason_code
				);
			}
			println!("{} of {} matching records", records.len(), total);
		}
	}
	Ok(())
}
