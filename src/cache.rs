//! Time-boxed, key-namespaced cache decorator for GET endpoints.
//!
//! [`CachedApiService`] wraps one endpoint. A read derives a [`CacheKey`] from the endpoint and
//! the normalized query parameters, returns the persisted [`CacheEntry`] while it is younger
//! than the TTL, and otherwise fetches, persists, and returns fresh data. Fetch failures leave
//! the persisted entry untouched.
//!
//! Concurrent misses on one key each fetch and the last write wins unless
//! [`CachedApiService::with_single_flight`] is enabled, in which case waiters queue behind a
//! per-key guard and re-read the cache once the first fetch lands.

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::ApiClient,
	obs::{self, CacheOutcome, CallKind, CallOutcome, CallSpan},
	query::NormalizedParams,
	store::{CacheStore, StoreError},
};

/// Default time-to-live for cached responses.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::minutes(5);

type FlightMap = Arc<Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>>;

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_millis() -> i64 {
	(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Persisted value plus the instant it was written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
	/// Cached response payload.
	pub data: T,
	/// Write time in Unix epoch milliseconds.
	pub timestamp: i64,
}
impl<T> CacheEntry<T> {
	/// Creates an entry stamped with the current time.
	pub fn new(data: T) -> Self {
		Self::at(data, now_millis())
	}

	/// Creates an entry with an explicit timestamp.
	pub fn at(data: T, timestamp: i64) -> Self {
		Self { data, timestamp }
	}

	/// An entry is fresh while `now - timestamp < ttl`.
	pub fn is_fresh_at(&self, now_ms: i64, ttl: Duration) -> bool {
		let ttl_ms = i64::try_from(ttl.whole_milliseconds()).unwrap_or(i64::MAX);

		now_ms.saturating_sub(self.timestamp) < ttl_ms
	}
}

/// Deterministic storage key derived from an endpoint and its query parameters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);
impl CacheKey {
	/// Namespace shared by every cache key.
	pub const PREFIX: &str = "api_cache_";

	/// Builds `api_cache_{endpoint}_{params}`, where `params` is the canonical JSON form of the
	/// parameters or empty when none are given.
	pub fn new<P>(endpoint: &str, params: Option<&P>) -> Result<Self, ConfigError>
	where
		P: ?Sized + Serialize,
	{
		let suffix = match params {
			Some(params) => NormalizedParams::new(params)?.canonical(),
			None => String::new(),
		};

		Ok(Self(format!("{}{endpoint}_{suffix}", Self::PREFIX)))
	}

	/// Borrows the key string.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for CacheKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Cache decorator bound to one GET endpoint.
pub struct CachedApiService<T> {
	client: ApiClient,
	store: Arc<dyn CacheStore>,
	endpoint: String,
	ttl: Duration,
	flights: Option<FlightMap>,
	_marker: PhantomData<fn() -> T>,
}
impl<T> CachedApiService<T>
where
	T: DeserializeOwned + Serialize,
{
	/// Creates a decorator for `endpoint` with [`DEFAULT_CACHE_DURATION`].
	pub fn new(client: ApiClient, store: Arc<dyn CacheStore>, endpoint: impl Into<String>) -> Self {
		Self {
			client,
			store,
			endpoint: endpoint.into(),
			ttl: DEFAULT_CACHE_DURATION,
			flights: None,
			_marker: PhantomData,
		}
	}

	/// Overrides the time-to-live.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Coalesces concurrent misses on the same key into one fetch.
	pub fn with_single_flight(mut self) -> Self {
		self.flights = Some(Default::default());

		self
	}

	/// Endpoint this decorator reads from.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// Configured time-to-live.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Key used for `params` on this endpoint.
	pub fn cache_key<P>(&self, params: Option<&P>) -> Result<CacheKey>
	where
		P: ?Sized + Serialize,
	{
		Ok(CacheKey::new(&self.endpoint, params)?)
	}

	/// Returns fresh cached data or fetches, persists, and returns new data.
	pub async fn get<P>(&self, params: Option<&P>) -> Result<T>
	where
		P: ?Sized + Serialize,
	{
		const KIND: CallKind = CallKind::CacheGet;

		let key = self.cache_key(params)?;
		let span = CallSpan::new(KIND, &self.endpoint);

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async {
				if let Some(data) = self.lookup(&key).await? {
					return Ok(data);
				}

				let flight = self.enter_flight(&key).await;

				if flight.is_some() {
					if let Some(data) = self.lookup(&key).await? {
						return Ok(data);
					}
				}

				self.fetch_and_store(&key, params).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Removes the entry for `params` regardless of its freshness.
	pub async fn clear_cache<P>(&self, params: Option<&P>) -> Result<()>
	where
		P: ?Sized + Serialize,
	{
		let key = self.cache_key(params)?;

		self.store.remove(key.as_str()).await?;

		tracing::debug!(endpoint = %self.endpoint, %key, "Cache cleared.");

		Ok(())
	}

	/// Writes `data` as a fresh entry for `params` without touching the network.
	pub async fn update_cache<P>(&self, data: T, params: Option<&P>) -> Result<()>
	where
		P: ?Sized + Serialize,
	{
		let key = self.cache_key(params)?;

		self.persist(&key, &CacheEntry::new(data)).await?;

		tracing::debug!(endpoint = %self.endpoint, %key, "Cache updated.");

		Ok(())
	}

	async fn lookup(&self, key: &CacheKey) -> Result<Option<T>> {
		let Some(raw) = self.store.get(key.as_str()).await? else {
			obs::record_cache_outcome(&self.endpoint, CacheOutcome::Miss);

			return Ok(None);
		};
		let entry = match serde_json::from_value::<CacheEntry<T>>(raw) {
			Ok(entry) => entry,
			Err(err) => {
				tracing::warn!(%key, error = %err, "Discarding undecodable cache entry.");
				obs::record_cache_outcome(&self.endpoint, CacheOutcome::Miss);

				return Ok(None);
			},
		};

		if entry.is_fresh_at(now_millis(), self.ttl) {
			tracing::debug!(endpoint = %self.endpoint, "Using cached data.");
			obs::record_cache_outcome(&self.endpoint, CacheOutcome::Hit);

			Ok(Some(entry.data))
		} else {
			obs::record_cache_outcome(&self.endpoint, CacheOutcome::Stale);

			Ok(None)
		}
	}

	async fn fetch_and_store<P>(&self, key: &CacheKey, params: Option<&P>) -> Result<T>
	where
		P: ?Sized + Serialize,
	{
		tracing::debug!(endpoint = %self.endpoint, "Fetching fresh data.");

		let data: T = self.client.get(&self.endpoint, params).await?;
		let entry = CacheEntry::new(data);

		self.persist(key, &entry).await?;

		Ok(entry.data)
	}

	async fn persist(&self, key: &CacheKey, entry: &CacheEntry<T>) -> Result<()> {
		let value = serde_json::to_value(entry).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize cache entry {key}: {e}"),
		})?;

		self.store.set(key.as_str(), value).await?;

		Ok(())
	}

	async fn enter_flight(&self, key: &CacheKey) -> Option<Flight> {
		let flights = self.flights.as_ref()?;
		let mutex = flights
			.lock()
			.entry(key.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone();
		let guard = mutex.lock_arc().await;

		Some(Flight { key: key.clone(), flights: flights.clone(), guard: Some(guard) })
	}

	#[cfg(test)]
	fn flights_in_use(&self) -> usize {
		self.flights.as_ref().map_or(0, |flights| flights.lock().len())
	}
}

/// Held while a single-flight fetch runs; evicts the key's guard once nobody else holds it.
struct Flight {
	key: CacheKey,
	flights: FlightMap,
	guard: Option<MutexGuardArc<()>>,
}
impl Drop for Flight {
	fn drop(&mut self) {
		drop(self.guard.take());

		// Waiters clone the mutex under this lock, so a count of one means the map is the
		// last holder.
		let mut flights = self.flights.lock();

		if flights.get(&self.key).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
			flights.remove(&self.key);
		}
	}
}
impl<T> Clone for CachedApiService<T> {
	fn clone(&self) -> Self {
		Self {
			client: self.client.clone(),
			store: self.store.clone(),
			endpoint: self.endpoint.clone(),
			ttl: self.ttl,
			flights: self.flights.clone(),
			_marker: PhantomData,
		}
	}
}
impl<T> Debug for CachedApiService<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedApiService")
			.field("endpoint", &self.endpoint)
			.field("ttl", &self.ttl)
			.field("single_flight", &self.flights.is_some())
			.finish()
	}
}
