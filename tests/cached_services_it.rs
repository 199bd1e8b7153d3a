mod common;

// std
use std::{env, fs, path::PathBuf, process, sync::Arc};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use changelog_client::{
	cache::{CacheEntry, CacheKey, now_millis},
	services::{ChangeQuery, ChangesService, Classification, ProvidersService},
	store::{CacheStore, FileStore},
};
use common::*;

#[tokio::test]
async fn fresh_entry_is_served_without_network() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes");
			then.status(200).json_body(json!([change_json(1, "Added webhooks.")]));
		})
		.await;
	let service = ChangesService::new(harness.client.clone(), Arc::new(harness.store.clone()));
	let first = service.get_all(None).await.expect("Initial read should fetch from the API.");
	let second = service.get_all(None).await.expect("Second read should hit the cache.");

	mock.assert_calls_async(1).await;

	assert_eq!(first, second);
	assert_eq!(first[0].diff.summary, "Added webhooks.");
	assert_eq!(harness.store.keys(), vec!["api_cache_/changes_".to_string()]);
}

#[tokio::test]
async fn stale_entry_is_refetched_and_replaced() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let key = CacheKey::new::<ChangeQuery>("/changes", None).expect("Cache key should derive.");
	let stale = CacheEntry::at(
		vec![change_json(1, "Old summary.")],
		now_millis() - Duration::minutes(6).whole_milliseconds() as i64,
	);

	harness
		.store
		.set(key.as_str(), serde_json::to_value(&stale).expect("Entry should serialize."))
		.await
		.expect("Seeding the store should succeed.");

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes");
			then.status(200).json_body(json!([change_json(1, "New summary.")]));
		})
		.await;
	let service = ChangesService::new(harness.client.clone(), Arc::new(harness.store.clone()));
	let changes = service.get_all(None).await.expect("Stale entry should trigger a refetch.");

	mock.assert_calls_async(1).await;

	assert_eq!(changes[0].diff.summary, "New summary.");

	let stored = harness
		.store
		.get(key.as_str())
		.await
		.expect("Reading the store should succeed.")
		.expect("Refetched entry should be persisted.");

	assert_eq!(stored["data"][0]["diff"]["summary"], "New summary.");
	assert!(
		stored["timestamp"].as_i64().expect("Stored timestamp should be an integer.")
			> stale.timestamp
	);
}

#[tokio::test]
async fn failed_refetch_leaves_stale_entry_untouched() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let key = CacheKey::new::<ChangeQuery>("/changes", None).expect("Cache key should derive.");
	let stale = serde_json::to_value(CacheEntry::at(vec![change_json(1, "Old summary.")], 0))
		.expect("Entry should serialize.");

	harness.store.set(key.as_str(), stale.clone()).await.expect("Seeding should succeed.");

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes");
			then.status(500).json_body(json!({ "message": "database offline" }));
		})
		.await;
	let service = ChangesService::new(harness.client.clone(), Arc::new(harness.store.clone()))
		.with_backoff(fast_backoff());
	let err = service.get_all(None).await.expect_err("Server failure should propagate.");

	// One cache-path fetch plus one fallback attempt; 500 is never retried.
	mock.assert_calls_async(2).await;

	assert_eq!(err.status(), Some(500));
	assert_eq!(err.server_message(), Some("database offline"));
	assert_eq!(
		harness.store.get(key.as_str()).await.expect("Reading the store should succeed."),
		Some(stale)
	);
}

#[tokio::test]
async fn parameters_are_cached_under_distinct_keys() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let filtered = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/changes")
				.query_param("limit", "5")
				.query_param("classification", "security");
			then.status(200).json_body(json!([change_json(2, "Patched CVE.")]));
		})
		.await;
	let unfiltered = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes").query_param_missing("limit");
			then.status(200).json_body(json!([change_json(1, "Added webhooks.")]));
		})
		.await;
	let service = ChangesService::new(harness.client.clone(), Arc::new(harness.store.clone()));
	let query = ChangeQuery::default().with_limit(5).with_classification(Classification::Security);

	service.get_all(Some(&query)).await.expect("Filtered read should succeed.");
	service.get_all(Some(&query)).await.expect("Filtered re-read should hit the cache.");
	service.get_all(None).await.expect("Unfiltered read should succeed.");

	filtered.assert_calls_async(1).await;
	unfiltered.assert_calls_async(1).await;

	assert_eq!(
		harness.store.keys(),
		vec![
			"api_cache_/changes_".to_string(),
			"api_cache_/changes_{\"classification\":\"security\",\"limit\":5}".to_string(),
		]
	);
}

#[tokio::test]
async fn clear_cache_forces_next_read_to_fetch() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/providers");
			then.status(200).json_body(json!([provider_json(1, "Stripe")]));
		})
		.await;
	let service = ProvidersService::new(harness.client.clone(), Arc::new(harness.store.clone()));

	service.get_all(None).await.expect("Initial read should succeed.");
	service.clear_cache(None).await.expect("Clearing the cache should succeed.");

	assert!(harness.store.is_empty());

	service.get_all(None).await.expect("Read after clearing should succeed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn seeded_cache_is_served_without_network() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/providers");
			then.status(200).json_body(json!([]));
		})
		.await;
	let service = ProvidersService::new(harness.client.clone(), Arc::new(harness.store.clone()));
	let seeded = serde_json::from_value(json!([provider_json(9, "Seeded")]))
		.expect("Provider fixture should decode.");

	service.resource().update_cache(seeded, None).await.expect("Seeding should succeed.");

	let providers = service.get_all(None).await.expect("Seeded read should succeed.");

	mock.assert_calls_async(0).await;

	assert_eq!(providers[0].name, "Seeded");
}

#[tokio::test]
async fn get_by_id_is_never_cached() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes/7");
			then.status(200).json_body(change_json(7, "Single change."));
		})
		.await;
	let service = ChangesService::new(harness.client.clone(), Arc::new(harness.store.clone()));

	service.get_by_id(7).await.expect("First item read should succeed.");

	let change = service.get_by_id(7).await.expect("Second item read should succeed.");

	mock.assert_calls_async(2).await;

	assert_eq!(change.id, 7);
	assert!(harness.store.is_empty());
}

#[tokio::test]
async fn store_failure_falls_back_without_populating_cache() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let store = Arc::new(FailingStore::default());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes");
			then.status(200).json_body(json!([change_json(3, "From fallback.")]));
		})
		.await;
	let service = ChangesService::new(harness.client.clone(), store.clone());
	let changes = service.get_all(None).await.expect("Fallback should return remote data.");

	mock.assert_calls_async(1).await;

	assert_eq!(changes[0].diff.summary, "From fallback.");
	assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn throttled_list_falls_back_and_exhausts_backoff() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes");
			then.status(429).header("retry-after", "2").json_body(json!({ "message": "slow down" }));
		})
		.await;
	let service = ChangesService::new(harness.client.clone(), Arc::new(harness.store.clone()))
		.with_backoff(fast_backoff());
	let err = service.get_all(None).await.expect_err("Persistent throttling should surface.");

	// Cache-path fetch, then the fallback's initial attempt and three retries.
	mock.assert_calls_async(5).await;

	assert!(err.is_rate_limited());
	assert!(harness.store.is_empty());
}

#[tokio::test]
async fn throttled_get_by_id_retries_before_failing() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/providers/2");
			then.status(429);
		})
		.await;
	let service = ProvidersService::new(harness.client.clone(), Arc::new(harness.store.clone()))
		.with_backoff(fast_backoff());
	let err = service.get_by_id(2).await.expect_err("Persistent throttling should surface.");

	mock.assert_calls_async(4).await;

	assert!(err.is_rate_limited());
}

#[tokio::test]
async fn providers_by_category_use_direct_path() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/providers/category/4");
			then.status(200).json_body(json!([provider_json(1, "Stripe"), provider_json(2, "Adyen")]));
		})
		.await;
	let service = ProvidersService::new(harness.client.clone(), Arc::new(harness.store.clone()));
	let providers = service.get_by_category(4).await.expect("Category read should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(providers.len(), 2);
	assert!(harness.store.is_empty());
}

#[tokio::test]
async fn concurrent_misses_fetch_twice_by_default() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes");
			then.status(200)
				.delay(std::time::Duration::from_millis(100))
				.json_body(json!([change_json(1, "Added webhooks.")]));
		})
		.await;
	let service = ChangesService::new(harness.client.clone(), Arc::new(harness.store.clone()));
	let (a, b) = tokio::join!(service.get_all(None), service.get_all(None));

	a.expect("First concurrent read should succeed.");
	b.expect("Second concurrent read should succeed.");
	mock.assert_calls_async(2).await;

	assert_eq!(harness.store.len(), 1);
}

#[tokio::test]
async fn single_flight_coalesces_concurrent_misses() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes");
			then.status(200)
				.delay(std::time::Duration::from_millis(100))
				.json_body(json!([change_json(1, "Added webhooks.")]));
		})
		.await;
	let service = ChangesService::new(harness.client.clone(), Arc::new(harness.store.clone()))
		.with_single_flight();
	let (a, b) = tokio::join!(service.get_all(None), service.get_all(None));

	assert_eq!(
		a.expect("Leader read should succeed."),
		b.expect("Follower read should succeed.")
	);

	mock.assert_calls_async(1).await;
}

fn snapshot_path(tag: &str) -> PathBuf {
	env::temp_dir().join(format!(
		"changelog_client_it_{tag}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	))
}

#[tokio::test]
async fn file_store_serves_cached_lists_across_reopen() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let path = snapshot_path("reopen");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/providers");
			then.status(200).json_body(json!([provider_json(1, "Stripe")]));
		})
		.await;
	let store = FileStore::open(&path).expect("File store should open.");
	let service = ProvidersService::new(harness.client.clone(), Arc::new(store));

	service.get_all(None).await.expect("Initial read should fetch.");
	service.get_all(None).await.expect("Second read should hit the file cache.");

	let reopened = FileStore::open(&path).expect("File store should reopen.");
	let service = ProvidersService::new(harness.client.clone(), Arc::new(reopened));
	let providers = service.get_all(None).await.expect("Read after reopen should hit the cache.");

	mock.assert_calls_async(1).await;

	assert_eq!(providers[0].name, "Stripe");

	fs::remove_file(&path).expect("Snapshot should be removable.");
}

#[tokio::test]
async fn unwritable_file_store_falls_back_without_caching() {
	let server = MockServer::start_async().await;
	let harness = harness(&server);
	let path = snapshot_path("unwritable");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/changes");
			then.status(200).json_body(json!([change_json(4, "Served anyway.")]));
		})
		.await;
	let store = Arc::new(FileStore::open(&path).expect("File store should open."));

	// A directory at the snapshot path makes every persist fail.
	fs::create_dir(&path).expect("Snapshot path should be blockable.");

	let service = ChangesService::new(harness.client.clone(), store.clone());
	let changes = service.get_all(None).await.expect("Fallback should return remote data.");

	// Cache-path fetch whose persist fails, then the fallback call.
	mock.assert_calls_async(2).await;

	assert_eq!(changes[0].diff.summary, "Served anyway.");

	let key = CacheKey::new::<ChangeQuery>("/changes", None).expect("Cache key should derive.");

	assert_eq!(store.get(key.as_str()).await.expect("Read should succeed."), None);

	fs::remove_dir(&path).expect("Blocking directory should be removable.");

	let _ = fs::remove_file(path.with_extension("tmp"));
}
