//! Thread-safe in-memory [`CacheStore`] implementation.

// self
use crate::{
	_prelude::*,
	store::{CacheStore, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, JsonValue>>>;

/// Storage backend that keeps cache entries in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Whether the store holds no keys.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Returns every stored key, sorted.
	pub fn keys(&self) -> Vec<String> {
		let mut keys: Vec<_> = self.0.read().keys().cloned().collect();

		keys.sort();

		keys
	}
}
impl CacheStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<JsonValue>> {
		let value = self.0.read().get(key).cloned();

		Box::pin(async move { Ok(value) })
	}

	fn set<'a>(&'a self, key: &'a str, value: JsonValue) -> StoreFuture<'a, ()> {
		self.0.write().insert(key.to_owned(), value);

		Box::pin(async move { Ok(()) })
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		self.0.write().remove(key);

		Box::pin(async move { Ok(()) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[tokio::test]
	async fn set_get_remove_cycle() {
		let store = MemoryStore::default();

		store.set("api_cache_/changes_", json!({ "a": 1 })).await.expect("Set should succeed.");

		assert_eq!(
			store.get("api_cache_/changes_").await.expect("Get should succeed."),
			Some(json!({ "a": 1 }))
		);
		assert_eq!(store.keys(), vec!["api_cache_/changes_".to_string()]);

		store.remove("api_cache_/changes_").await.expect("Remove should succeed.");
		store.remove("missing").await.expect("Removing a missing key should succeed.");

		assert!(store.is_empty());
	}
}
