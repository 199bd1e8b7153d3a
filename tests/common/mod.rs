#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::MockServer;
use parking_lot::Mutex;
use serde_json::{Value, json};
use time::Duration;
// self
use changelog_client::{
	config::ClientConfig,
	http::ApiClient,
	rate_limit::Backoff,
	session::{MemorySessionProvider, Navigator, Session},
	store::{CacheStore, MemoryStore, StoreError, StoreFuture},
};

pub const ACCESS_TOKEN: &str = "token-1";

#[derive(Debug, Default)]
pub struct RecordingNavigator(Mutex<Vec<String>>);
impl RecordingNavigator {
	pub fn visited(&self) -> Vec<String> {
		self.0.lock().clone()
	}
}
impl Navigator for RecordingNavigator {
	fn navigate(&self, path: &str) {
		self.0.lock().push(path.to_owned());
	}
}

/// Store whose reads always fail; writes are counted and dropped.
#[derive(Debug, Default)]
pub struct FailingStore {
	writes: AtomicUsize,
}
impl FailingStore {
	pub fn writes(&self) -> usize {
		self.writes.load(Ordering::Relaxed)
	}
}
impl CacheStore for FailingStore {
	fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<Value>> {
		Box::pin(async { Err(StoreError::Backend { message: "storage unavailable".into() }) })
	}

	fn set<'a>(&'a self, _key: &'a str, _value: Value) -> StoreFuture<'a, ()> {
		self.writes.fetch_add(1, Ordering::Relaxed);

		Box::pin(async { Ok(()) })
	}

	fn remove<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}
}

pub struct Harness {
	pub client: ApiClient,
	pub session: Arc<MemorySessionProvider>,
	pub navigator: Arc<RecordingNavigator>,
	pub store: MemoryStore,
}

pub fn harness(server: &MockServer) -> Harness {
	harness_with_session(server, Some(Session::with_access_token(ACCESS_TOKEN)))
}

pub fn harness_with_session(server: &MockServer, session: Option<Session>) -> Harness {
	let session = Arc::new(match session {
		Some(session) => MemorySessionProvider::signed_in(session),
		None => MemorySessionProvider::default(),
	});
	let navigator = Arc::new(RecordingNavigator::default());
	let client = ApiClient::new(ClientConfig::new(server.url("/v1")), session.clone(), navigator.clone())
		.expect("Client should build against the mock server.");

	Harness { client, session, navigator, store: MemoryStore::default() }
}

pub fn fast_backoff() -> Backoff {
	Backoff::new(3, Duration::milliseconds(10))
}

pub fn change_json(id: u64, summary: &str) -> Value {
	json!({
		"id": id,
		"source_id": 1,
		"snapshot_id1": 10,
		"snapshot_id2": 11,
		"diff": { "summary": summary },
		"classification": "new_feature",
		"explanation": "Generated explanation.",
		"timestamp": "2024-05-01T12:00:00Z"
	})
}

pub fn provider_json(id: u64, name: &str) -> Value {
	json!({ "id": id, "name": name, "category_id": 4 })
}
