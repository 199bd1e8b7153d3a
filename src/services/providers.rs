//! Upstream providers whose changelogs are aggregated.

// self
use crate::{
	_prelude::*,
	http::ApiClient,
	rate_limit::{Backoff, RateLimitedMethod},
	services::CachedResource,
	store::CacheStore,
};

/// Tracked source of a provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSource {
	/// Page being snapshotted.
	pub url: String,
	/// Time of the most recent snapshot.
	pub last_snapshot_at: String,
}

/// Provider record.
///
/// Listing and detail endpoints return different subsets of fields, so everything beyond
/// the identity is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provider {
	/// Provider identifier.
	pub id: u64,
	/// Display name.
	pub name: String,
	/// Category the provider belongs to.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category_id: Option<u64>,
	/// Landing page.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	/// Short description.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Tracked sources.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sources: Option<Vec<ProviderSource>>,
	/// Number of detected changes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub changes: Option<u64>,
	/// Creation time.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
	/// Last update time.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<String>,
}

/// Filters accepted by `GET /providers`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProviderQuery {
	/// Category name filter.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
}

/// Cache-first access to `/providers`.
#[derive(Debug)]
pub struct ProvidersService {
	resource: CachedResource<Provider, ProviderQuery>,
	by_category: RateLimitedMethod<u64, Vec<Provider>>,
}
impl ProvidersService {
	/// Collection endpoint.
	pub const ENDPOINT: &str = "/providers";
	/// Freshness window for cached provider lists.
	pub const TTL: Duration = Duration::minutes(10);

	/// Creates the service over `client`, caching lists in `store`.
	pub fn new(client: ApiClient, store: Arc<dyn CacheStore>) -> Self {
		let by_category = {
			let client = client.clone();

			RateLimitedMethod::new(move |category_id: u64| {
				let client = client.clone();
				let path = format!("{}/category/{category_id}", Self::ENDPOINT);

				async move { client.get::<Vec<Provider>, JsonValue>(&path, None).await }
			})
			.with_endpoint(format!("{}/category/:id", Self::ENDPOINT))
		};

		Self { resource: CachedResource::new(client, store, Self::ENDPOINT, Self::TTL), by_category }
	}

	/// Replaces the retry policy of the direct reads.
	pub fn with_backoff(mut self, backoff: Backoff) -> Self {
		self.resource = self.resource.with_backoff(backoff);
		self.by_category = self.by_category.with_policy(backoff);

		self
	}

	/// Coalesces concurrent cache misses on the same filters.
	pub fn with_single_flight(mut self) -> Self {
		self.resource = self.resource.with_single_flight();

		self
	}

	/// Underlying composite resource.
	pub fn resource(&self) -> &CachedResource<Provider, ProviderQuery> {
		&self.resource
	}

	/// Lists providers, cache-first.
	pub async fn get_all(&self, params: Option<&ProviderQuery>) -> Result<Vec<Provider>> {
		self.resource.get_all(params).await
	}

	/// Fetches one provider; never cached.
	pub async fn get_by_id(&self, id: u64) -> Result<Provider> {
		self.resource.get_by_id(id).await
	}

	/// Lists the providers of one category through the rate-limited direct path.
	pub async fn get_by_category(&self, category_id: u64) -> Result<Vec<Provider>> {
		self.by_category.call(category_id).await
	}

	/// Invalidates the cached list for `params`.
	pub async fn clear_cache(&self, params: Option<&ProviderQuery>) -> Result<()> {
		self.resource.clear_cache(params).await
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn provider_accepts_listing_and_detail_shapes() {
		let listing: Provider = serde_json::from_value(json!({
			"id": 1,
			"name": "Stripe",
			"category_id": 4,
			"sources": [{ "url": "https://stripe.com/changelog", "last_snapshot_at": "2024-05-01" }],
			"changes": 12
		}))
		.expect("Listing shape should decode.");
		let detail: Provider = serde_json::from_value(json!({
			"id": 1,
			"name": "Stripe",
			"url": "https://stripe.com",
			"description": "Payments.",
			"created_at": "2024-01-01",
			"updated_at": "2024-05-01"
		}))
		.expect("Detail shape should decode.");

		assert_eq!(listing.category_id, Some(4));
		assert_eq!(listing.sources.as_ref().map(Vec::len), Some(1));
		assert_eq!(detail.description.as_deref(), Some("Payments."));
		assert_eq!(detail.category_id, None);
	}

	#[test]
	fn cached_form_round_trips_without_nulls() {
		let provider = Provider { id: 3, name: "GitHub".into(), ..Default::default() };
		let value = serde_json::to_value(&provider).expect("Provider should serialize.");

		assert_eq!(value, json!({ "id": 3, "name": "GitHub" }));
	}
}
