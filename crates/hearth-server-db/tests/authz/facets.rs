// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{Duration, Utc};
use hearth_server_auth::{
	facet::known, AssignOptions, AuthError, EntityRef, FacetDefinition, FacetRef, HistoryAction,
	NewAssignment, UserId,
};
use sqlx::Row;

use super::support::Harness;

#[tokio::test]
async fn assign_then_revoke_round_trip() {
	let h = Harness::new().await;
	let (user, _) = h.user("ada").await;
	let entity = EntityRef::user(user);
	let catalog = h.engine.facets();

	assert!(!catalog.has_facet(&entity, &known::support()).await.unwrap());
	catalog
		.assign(&known::support(), &entity, h.system, AssignOptions::reason("on call"))
		.await
		.unwrap();
	assert!(catalog.has_facet(&entity, &known::support()).await.unwrap());

	assert!(catalog
		.revoke(&known::support(), &entity, h.system, Some("rotation over".to_string()))
		.await
		.unwrap());
	assert!(!catalog.has_facet(&entity, &known::support()).await.unwrap());

	let history = catalog.list_history(&entity, Some(&known::support())).await.unwrap();
	let actions: Vec<_> = history.iter().map(|e| e.action).collect();
	assert_eq!(actions, vec![HistoryAction::Assigned, HistoryAction::Revoked]);
	assert_eq!(history[0].reason.as_deref(), Some("on call"));
}

#[tokio::test]
async fn repeated_assign_keeps_one_row() {
	let h = Harness::new().await;
	let entity = EntityRef::user(UserId::generate());
	let catalog = h.engine.facets();

	for _ in 0..3 {
		catalog
			.assign(&known::content_moderator(), &entity, h.system, AssignOptions::default())
			.await
			.unwrap();
	}

	let rows: i64 = sqlx::query("SELECT COUNT(*) AS n FROM facet_assignments WHERE entity_id = ?")
		.bind(entity.entity_id.to_string())
		.fetch_one(&h.pool)
		.await
		.unwrap()
		.get("n");
	assert_eq!(rows, 1);
	assert_eq!(catalog.get_facets(&entity, None).await.unwrap().len(), 1);
	assert_eq!(catalog.list_history(&entity, None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn revoking_unassigned_or_undefined_is_silent() {
	let h = Harness::new().await;
	let entity = EntityRef::user(UserId::generate());
	let catalog = h.engine.facets();

	assert!(!catalog.revoke(&known::support(), &entity, h.system, None).await.unwrap());
	assert!(!catalog
		.revoke(&FacetRef::new("role", "wizard"), &entity, h.system, None)
		.await
		.unwrap());
	assert!(catalog.list_history(&entity, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn undefined_facet_cannot_be_assigned() {
	let h = Harness::new().await;
	let err = h
		.engine
		.facets()
		.assign(
			&FacetRef::new("role", "wizard"),
			&EntityRef::user(UserId::generate()),
			h.system,
			AssignOptions::default(),
		)
		.await
		.unwrap_err();
	assert!(matches!(err, AuthError::UndefinedFacet(_)));
	assert!(err.is_configuration());
}

#[tokio::test]
async fn expiry_is_evaluated_at_read_time() {
	let h = Harness::new().await;
	let definition = h.define(FacetDefinition::new(&FacetRef::new("team", "lead"))).await;
	let entity = EntityRef::user(UserId::generate());

	// Write an already-lapsed row directly; the catalog refuses past expiries.
	h.facets
		.upsert_assignment(&NewAssignment {
			facet_id: definition.id,
			entity,
			assigned_by: h.system,
			assigned_at: Utc::now() - Duration::days(10),
			expires_at: Some(Utc::now() - Duration::seconds(1)),
			review_at: None,
			reason: None,
			metadata: None,
		})
		.await
		.unwrap();

	let catalog = h.engine.facets();
	assert!(!catalog.has_facet(&entity, &definition.facet_ref()).await.unwrap());
	assert!(catalog.get_facets(&entity, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn default_expiry_and_review_come_from_definition() {
	let h = Harness::new().await;
	let facet = FacetRef::new("team", "reviewer");
	h.define(FacetDefinition::new(&facet).with_expiry_days(7).with_review_days(3))
		.await;
	let entity = EntityRef::user(UserId::generate());

	let assignment = h
		.engine
		.facets()
		.assign(&facet, &entity, h.system, AssignOptions::default())
		.await
		.unwrap();

	let expires = assignment.expires_at.unwrap() - assignment.assigned_at;
	let review = assignment.review_at.unwrap() - assignment.assigned_at;
	assert_eq!(expires, Duration::days(7));
	assert_eq!(review, Duration::days(3));
}

#[tokio::test]
async fn creator_levels_and_values() {
	let h = Harness::new().await;
	h.define(FacetDefinition::new(&known::creator_tier("silver")).with_level(1))
		.await;
	h.define(FacetDefinition::new(&known::creator_tier("gold")).with_level(known::PAYWALL_MIN_CREATOR_LEVEL))
		.await;
	let entity = EntityRef::user(UserId::generate());
	let catalog = h.engine.facets();

	catalog
		.assign(&known::creator_tier("silver"), &entity, h.system, AssignOptions::default())
		.await
		.unwrap();
	assert!(!catalog
		.has_facet_at_level(&entity, known::CREATOR_SCOPE, known::PAYWALL_MIN_CREATOR_LEVEL)
		.await
		.unwrap());

	catalog
		.assign(&known::creator_tier("gold"), &entity, h.system, AssignOptions::default())
		.await
		.unwrap();
	assert!(catalog
		.has_facet_at_level(&entity, known::CREATOR_SCOPE, known::PAYWALL_MIN_CREATOR_LEVEL)
		.await
		.unwrap());
	assert!(catalog
		.has_facet(&entity, &FacetRef::new(known::CREATOR_SCOPE, "tier"))
		.await
		.unwrap());
	assert_eq!(
		catalog
			.get_facet_value(&entity, known::CREATOR_SCOPE, "tier")
			.await
			.unwrap()
			.as_deref(),
		Some("gold")
	);
}
