//! Resource services built on the client core.
//!
//! [`CachedResource`] is the composite glue: a [`CachedApiService`] over the list endpoint and
//! two [`RateLimitedMethod`]s for direct list and single-item reads. List reads go cache-first
//! and fall back to the rate-limited direct call on any error from the cache path; that
//! fallback bypasses the cache entirely and does not populate it. Single items are never
//! cached.

pub mod changelogs;
pub mod changes;
pub mod providers;

pub use changelogs::*;
pub use changes::*;
pub use providers::*;

// self
use crate::{
	_prelude::*,
	cache::CachedApiService,
	http::ApiClient,
	obs::{self, CallKind, CallOutcome, CallSpan},
	rate_limit::{Backoff, RateLimitedMethod},
	store::CacheStore,
};

/// Cache-first list reads plus rate-limited direct reads for one resource.
pub struct CachedResource<T, P> {
	cache: CachedApiService<Vec<T>>,
	list: RateLimitedMethod<Option<P>, Vec<T>>,
	item: RateLimitedMethod<u64, T>,
}
impl<T, P> CachedResource<T, P>
where
	T: 'static + DeserializeOwned + Serialize + Send,
	P: 'static + Serialize + Clone + Send + Sync,
{
	/// Binds the resource to `endpoint`; items live at `{endpoint}/{id}`.
	pub fn new(
		client: ApiClient,
		store: Arc<dyn CacheStore>,
		endpoint: impl Into<String>,
		ttl: Duration,
	) -> Self {
		let endpoint = endpoint.into();
		let list = {
			let client = client.clone();
			let path = endpoint.clone();

			RateLimitedMethod::new(move |params: Option<P>| {
				let client = client.clone();
				let path = path.clone();

				async move { client.get::<Vec<T>, P>(&path, params.as_ref()).await }
			})
			.with_endpoint(&endpoint)
		};
		let item = {
			let client = client.clone();
			let base = endpoint.clone();

			RateLimitedMethod::new(move |id: u64| {
				let client = client.clone();
				let path = format!("{base}/{id}");

				async move { client.get::<T, JsonValue>(&path, None).await }
			})
			.with_endpoint(format!("{endpoint}/:id"))
		};
		let cache = CachedApiService::new(client, store, endpoint).with_ttl(ttl);

		Self { cache, list, item }
	}

	/// Replaces the retry policy of both direct reads.
	pub fn with_backoff(mut self, backoff: Backoff) -> Self {
		self.list = self.list.with_policy(backoff);
		self.item = self.item.with_policy(backoff);

		self
	}

	/// Coalesces concurrent cache misses on the same key.
	pub fn with_single_flight(mut self) -> Self {
		self.cache = self.cache.with_single_flight();

		self
	}

	/// Cache decorator backing [`get_all`](Self::get_all).
	pub fn cache(&self) -> &CachedApiService<Vec<T>> {
		&self.cache
	}

	/// Lists the resource through the cache, falling back to a rate-limited direct call.
	pub async fn get_all(&self, params: Option<&P>) -> Result<Vec<T>> {
		let cache_error = match self.cache.get(params).await {
			Ok(data) => return Ok(data),
			Err(err) => err,
		};
		let endpoint = self.cache.endpoint();

		tracing::warn!(
			%endpoint,
			error = %cache_error,
			"Cache access failed; using rate-limited API call."
		);
		obs::record_call_outcome(CallKind::Fallback, CallOutcome::Attempt);

		let result =
			CallSpan::new(CallKind::Fallback, endpoint).instrument(self.list.call(params.cloned())).await;

		match &result {
			Ok(_) => obs::record_call_outcome(CallKind::Fallback, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(CallKind::Fallback, CallOutcome::Failure),
		}

		result
	}

	/// Fetches one item through the rate-limited direct path; items are never cached.
	pub async fn get_by_id(&self, id: u64) -> Result<T> {
		CallSpan::new(CallKind::RateLimited, self.cache.endpoint())
			.instrument(self.item.call(id))
			.await
	}

	/// Drops the cached list for `params`; call after any mutation of the resource.
	pub async fn clear_cache(&self, params: Option<&P>) -> Result<()> {
		self.cache.clear_cache(params).await
	}

	/// Seeds the cached list for `params` with data obtained elsewhere.
	pub async fn update_cache(&self, data: Vec<T>, params: Option<&P>) -> Result<()> {
		self.cache.update_cache(data, params).await
	}
}
impl<T, P> Debug for CachedResource<T, P> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedResource")
			.field("cache", &self.cache)
			.field("list", &self.list)
			.field("item", &self.item)
			.finish()
	}
}
