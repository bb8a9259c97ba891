// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use hearth_server_audit::{
	AuditConfig, AuditDelivery, AuditOptions, AuditSink, PermissionAuditor, QueueAuditSink,
	SqliteAuditSink,
};
use hearth_server_auth::{
	policies::content, AuthenticationContext, ContentAttrs, ContentId, DecisionBuilder, Operation,
	ReasonCode, UserId, Visibility,
};
use hearth_server_db::{AuditQuery, AuditRepository};

use super::support::Harness;

fn config(asynchronous: bool) -> AuditConfig {
	AuditConfig {
		enabled: true,
		asynchronous,
		queue_capacity: 16,
		spill_path: None,
	}
}

async fn wait_for_rows(repo: &AuditRepository, query: &AuditQuery, expected: i64) -> i64 {
	let mut total = 0;
	for _ in 0..100 {
		total = repo.query(query).await.unwrap().1;
		if total >= expected {
			break;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	total
}

async fn public_read(h: &Harness, ctx: &AuthenticationContext) -> hearth_server_auth::PermissionResult {
	let post = ContentAttrs::new(ContentId::generate(), UserId::generate()).with_visibility(Visibility::Public);
	content::can_read(&h.engine, ctx, &post).await.unwrap()
}

#[tokio::test]
async fn synchronous_write_is_queryable() {
	let h = Harness::new().await;
	let (user, ctx) = h.user("reader").await;
	let ctx = ctx.with_request_id("req-1").with_ip_address("10.0.0.1");
	let auditor = PermissionAuditor::sqlite(h.pool.clone(), &config(false)).unwrap();

	let result = public_read(&h, &ctx).await;
	let delivery = auditor
		.audit_permission(&result, &ctx, "content", auditor.defaults())
		.await
		.unwrap();
	assert_eq!(delivery, AuditDelivery::Written);

	let (records, total) = AuditRepository::new(h.pool.clone())
		.query(&AuditQuery::for_actor(user))
		.await
		.unwrap();
	assert_eq!(total, 1);
	let record = &records[0];
	assert!(record.granted);
	assert_eq!(record.reason_code, ReasonCode::PublicContent.to_string());
	assert_eq!(record.resource_type, "content");
	assert_eq!(record.request_id.as_deref(), Some("req-1"));
	assert_eq!(record.ip_address.as_deref(), Some("10.0.0.1"));
}

#[tokio::test]
async fn asynchronous_write_is_drained() {
	let h = Harness::new().await;
	let (user, ctx) = h.user("reader").await;
	let auditor = PermissionAuditor::sqlite(h.pool.clone(), &config(true)).unwrap();
	let repo = AuditRepository::new(h.pool.clone());

	let result = public_read(&h, &ctx).await;
	let delivery = auditor
		.audit_permission(&result, &ctx, "content", auditor.defaults())
		.await
		.unwrap();
	assert_eq!(delivery, AuditDelivery::Queued);

	assert_eq!(wait_for_rows(&repo, &AuditQuery::for_actor(user), 1).await, 1);
}

#[tokio::test]
async fn shutdown_persists_queued_records() {
	let h = Harness::new().await;
	let (user, ctx) = h.user("reader").await;
	let auditor = PermissionAuditor::sqlite(h.pool.clone(), &config(true)).unwrap();

	for _ in 0..3 {
		let result = public_read(&h, &ctx).await;
		let delivery = auditor
			.audit_permission(&result, &ctx, "content", auditor.defaults())
			.await
			.unwrap();
		assert_eq!(delivery, AuditDelivery::Queued);
	}
	auditor.shutdown().await;

	let (_, total) = AuditRepository::new(h.pool.clone())
		.query(&AuditQuery::for_actor(user))
		.await
		.unwrap();
	assert_eq!(total, 3);
}

#[tokio::test]
async fn unwritable_database_spills_to_file() {
	let h = Harness::new().await;
	let (user, ctx) = h.user("reader").await;
	let dir = tempfile::tempdir().unwrap();
	let spill = dir.path().join("audit-spill.jsonl");
	let auditor = PermissionAuditor::sqlite(
		h.pool.clone(),
		&AuditConfig {
			spill_path: Some(spill.to_string_lossy().into_owned()),
			..config(true)
		},
	)
	.unwrap();

	h.pool.close().await;
	let result = public_read(&h, &ctx).await;
	let delivery = auditor
		.audit_permission(&result, &ctx, "content", auditor.defaults())
		.await
		.unwrap();
	assert_eq!(delivery, AuditDelivery::Queued);
	auditor.shutdown().await;

	let contents = tokio::fs::read_to_string(&spill).await.unwrap();
	let lines: Vec<_> = contents.lines().collect();
	assert_eq!(lines.len(), 1);
	let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
	assert_eq!(record["actor_user_id"], user.to_string());
	assert_eq!(record["granted"], true);
}

#[tokio::test]
async fn closed_queue_falls_back_to_direct_write() {
	let h = Harness::new().await;
	let (user, ctx) = h.user("reader").await;
	let durable: Arc<dyn AuditSink> = Arc::new(SqliteAuditSink::new(h.pool.clone()));
	let (queue, drain) = QueueAuditSink::new(4, Arc::clone(&durable));
	drop(drain);
	let auditor = PermissionAuditor::new(Arc::new(queue), durable, AuditOptions::default());

	let result = public_read(&h, &ctx).await;
	let delivery = auditor
		.audit_permission(&result, &ctx, "content", AuditOptions::default())
		.await
		.unwrap();
	assert_eq!(delivery, AuditDelivery::Written);

	let (_, total) = AuditRepository::new(h.pool.clone())
		.query(&AuditQuery::for_actor(user))
		.await
		.unwrap();
	assert_eq!(total, 1);
}

#[tokio::test]
async fn disabled_audit_writes_nothing() {
	let h = Harness::new().await;
	let (user, ctx) = h.user("reader").await;
	let auditor = PermissionAuditor::sqlite(h.pool.clone(), &config(false)).unwrap();

	let result = public_read(&h, &ctx).await;
	let delivery = auditor
		.audit_permission(&result, &ctx, "content", AuditOptions::disabled())
		.await
		.unwrap();
	assert_eq!(delivery, AuditDelivery::Skipped);

	let (records, total) = AuditRepository::new(h.pool.clone())
		.query(&AuditQuery::for_actor(user))
		.await
		.unwrap();
	assert!(records.is_empty());
	assert_eq!(total, 0);
}

#[tokio::test]
async fn check_and_audit_records_denials() {
	let h = Harness::new().await;
	let (author, _) = h.user("author").await;
	let (stranger, stranger_ctx) = h.user("stranger").await;
	let auditor = PermissionAuditor::sqlite(h.pool.clone(), &config(false)).unwrap();
	let post = ContentAttrs::new(ContentId::generate(), author).with_visibility(Visibility::Friends);

	let result = auditor
		.check_and_audit(
			&stranger_ctx,
			DecisionBuilder::new(&stranger_ctx, Operation::ContentRead, post.id),
			content::can_read(&h.engine, &stranger_ctx, &post),
		)
		.await;
	assert!(!result.is_granted());

	let (records, _) = AuditRepository::new(h.pool.clone())
		.query(&AuditQuery::for_resource("content", post.id.to_string()))
		.await
		.unwrap();
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].actor_user_id, Some(stranger));
	assert!(!records[0].granted);
	assert_eq!(records[0].operation, Operation::ContentRead.to_string());
	assert_eq!(records[0].reason_code, ReasonCode::DefaultDeny.to_string());
}

#[tokio::test]
async fn query_filters_and_limits() {
	let h = Harness::new().await;
	let (reader, reader_ctx) = h.user("reader").await;
	let (other, other_ctx) = h.user("other").await;
	let auditor = PermissionAuditor::sqlite(h.pool.clone(), &config(false)).unwrap();
	let options = AuditOptions::synchronous();

	for _ in 0..3 {
		let result = public_read(&h, &reader_ctx).await;
		auditor
			.audit_permission(&result, &reader_ctx, "content", options)
			.await
			.unwrap();
	}
	let denied = DecisionBuilder::new(&other_ctx, Operation::ContentRead, ContentId::generate())
		.deny(ReasonCode::DefaultDeny);
	auditor
		.audit_permission(&denied, &other_ctx, "content", options)
		.await
		.unwrap();

	let repo = AuditRepository::new(h.pool.clone());

	let (records, total) = repo
		.query(&AuditQuery {
			limit: Some(2),
			..AuditQuery::for_actor(reader)
		})
		.await
		.unwrap();
	assert_eq!(records.len(), 2);
	assert_eq!(total, 3);

	let (records, total) = repo
		.query(&AuditQuery {
			granted: Some(false),
			..Default::default()
		})
		.await
		.unwrap();
	assert_eq!(total, 1);
	assert_eq!(records[0].actor_user_id, Some(other));

	let (_, total) = repo
		.query(&AuditQuery {
			operation: Some(Operation::ContentRead.to_string()),
			..Default::default()
		})
		.await
		.unwrap();
	assert_eq!(total, 4);
}
