// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use hearth_server_auth::{UserId, UserRecord};

use super::support::Harness;

/// a reports to b, b to c, c to d.
async fn chain(h: &Harness) -> [UserId; 4] {
	let d = h.insert_user(UserRecord::new(UserId::generate(), "d")).await.id;
	let c = h
		.insert_user(UserRecord::new(UserId::generate(), "c").with_manager(d))
		.await
		.id;
	let b = h
		.insert_user(UserRecord::new(UserId::generate(), "b").with_manager(c))
		.await
		.id;
	let a = h
		.insert_user(UserRecord::new(UserId::generate(), "a").with_manager(b))
		.await
		.id;
	[a, b, c, d]
}

#[tokio::test]
async fn chain_reachability() {
	let h = Harness::new().await;
	let [a, b, c, d] = chain(&h).await;
	let resolver = h.engine.relationships();

	assert!(resolver.is_administrator_for(d, a, true).await.unwrap());
	assert!(!resolver.is_administrator_for(d, a, false).await.unwrap());
	assert!(resolver.is_administrator_for(b, a, true).await.unwrap());
	assert!(resolver.is_administrator_for(c, a, true).await.unwrap());
	assert!(!resolver.is_administrator_for(a, d, true).await.unwrap());
	assert!(!resolver.is_administrator_for(a, a, true).await.unwrap());

	let all = resolver.get_all_reports(d).await.unwrap();
	assert_eq!(all, vec![c, b, a]);
	assert_eq!(resolver.get_direct_reports(d).await.unwrap(), vec![c]);
}

#[tokio::test]
async fn cycles_terminate() {
	let h = Harness::new().await;
	let a = h.insert_user(UserRecord::new(UserId::generate(), "a")).await.id;
	let b = h
		.insert_user(UserRecord::new(UserId::generate(), "b").with_manager(a))
		.await
		.id;
	h.users.set_manager(a, Some(b)).await.unwrap();
	let resolver = h.engine.relationships();

	assert!(resolver.is_administrator_for(a, b, true).await.unwrap());
	assert!(resolver.is_administrator_for(b, a, true).await.unwrap());
	assert!(!resolver
		.is_administrator_for(UserId::generate(), a, true)
		.await
		.unwrap());
	assert_eq!(resolver.get_all_reports(a).await.unwrap(), vec![b]);
}

#[tokio::test]
async fn circular_reference_check_guards_reassignment() {
	let h = Harness::new().await;
	let [a, _b, _c, d] = chain(&h).await;
	let resolver = h.engine.relationships();

	// Making d report to a would close the loop.
	assert!(resolver.check_for_circular_reference(d, a).await.unwrap());
	assert!(resolver.check_for_circular_reference(a, a).await.unwrap());

	let outsider = h.insert_user(UserRecord::new(UserId::generate(), "e")).await.id;
	assert!(!resolver.check_for_circular_reference(d, outsider).await.unwrap());
}
