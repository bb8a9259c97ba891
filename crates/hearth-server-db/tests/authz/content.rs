// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use hearth_server_auth::{
	facet::known, policies::content, safe_permission_check, AuthenticationContext, ContentAttrs,
	ContentId, DecisionBuilder, DivisionId, EntityRef, Operation, ReasonCode, UserId, UserRecord,
	Visibility,
};

use super::support::Harness;

fn item(author: UserId, visibility: Visibility) -> ContentAttrs {
	ContentAttrs::new(ContentId::generate(), author).with_visibility(visibility)
}

#[tokio::test]
async fn anonymous_reads_public_but_not_friends_only() {
	let h = Harness::new().await;
	let (author, _) = h.user("author").await;
	let anonymous = AuthenticationContext::anonymous();

	let result = content::can_read(&h.engine, &anonymous, &item(author, Visibility::Public))
		.await
		.unwrap();
	assert!(result.is_granted());
	assert_eq!(result.reason_code(), ReasonCode::PublicContent);

	let result = content::can_read(&h.engine, &anonymous, &item(author, Visibility::Friends))
		.await
		.unwrap();
	assert!(!result.is_granted());
	assert_eq!(result.reason_code(), ReasonCode::NotAuthenticated);
}

#[tokio::test]
async fn friends_only_follows_accepted_connections() {
	let h = Harness::new().await;
	let (author, _) = h.user("author").await;
	let (friend, friend_ctx) = h.user("friend").await;
	let (_, stranger_ctx) = h.user("stranger").await;
	h.befriend(friend, author).await;
	let post = item(author, Visibility::Friends);

	let result = content::can_read(&h.engine, &friend_ctx, &post).await.unwrap();
	assert_eq!(result.reason_code(), ReasonCode::Friends);

	let result = content::can_read(&h.engine, &stranger_ctx, &post).await.unwrap();
	assert!(!result.is_granted());
	assert_eq!(result.reason_code(), ReasonCode::DefaultDeny);
}

#[tokio::test]
async fn division_visibility_uses_stored_records() {
	let h = Harness::new().await;
	let division = DivisionId::generate();
	let author = h
		.insert_user(UserRecord::new(UserId::generate(), "author").with_division(division))
		.await;
	let colleague = h
		.insert_user(UserRecord::new(UserId::generate(), "colleague").with_division(division))
		.await;
	let post = item(author.id, Visibility::Division);

	let result = content::can_read(&h.engine, &AuthenticationContext::authenticated(colleague), &post)
		.await
		.unwrap();
	assert!(result.is_granted());

	let (_, outsider) = h.user("outsider").await;
	assert!(!content::can_read(&h.engine, &outsider, &post).await.unwrap().is_granted());
}

#[tokio::test]
async fn global_admin_delete_is_revocable() {
	let h = Harness::new().await;
	let (admin, admin_ctx) = h.user("admin").await;
	let (author, _) = h.user("author").await;
	let post = item(author, Visibility::Public);

	h.grant(admin, &known::global_admin()).await;
	let result = content::can_delete(&h.engine, &admin_ctx, &post).await.unwrap();
	assert!(result.is_granted());
	assert_eq!(result.reason_code(), ReasonCode::GlobalAdmin);

	let revoked = h
		.engine
		.facets()
		.revoke(&known::global_admin(), &EntityRef::user(admin), h.system, None)
		.await
		.unwrap();
	assert!(revoked);

	let result = content::can_delete(&h.engine, &admin_ctx, &post).await.unwrap();
	assert!(!result.is_granted());
}

#[tokio::test]
async fn closed_pool_fails_closed() {
	let h = Harness::new().await;
	let (_, ctx) = h.user("reader").await;
	let post = item(UserId::generate(), Visibility::Friends);
	h.pool.close().await;

	let result = safe_permission_check(
		content::can_read(&h.engine, &ctx, &post),
		DecisionBuilder::new(&ctx, Operation::ContentRead, post.id),
	)
	.await;

	assert!(!result.is_granted());
	assert_eq!(result.reason_code(), ReasonCode::PermissionCheckError);
	assert_eq!(result.metadata().unwrap()["configuration"], false);
}
