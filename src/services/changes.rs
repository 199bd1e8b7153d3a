//! Detected changes between provider snapshots.

// self
use crate::{
	_prelude::*,
	http::ApiClient,
	rate_limit::Backoff,
	services::CachedResource,
	store::CacheStore,
};

/// Impact classification assigned to a detected change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
	/// Backwards-incompatible change.
	Breaking,
	/// Security fix or advisory.
	Security,
	/// Performance change.
	Performance,
	/// Newly added capability.
	NewFeature,
	/// Small fix.
	MinorFix,
	/// Anything else.
	Other,
}
impl Classification {
	/// Returns the wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Breaking => "breaking",
			Self::Security => "security",
			Self::Performance => "performance",
			Self::NewFeature => "new_feature",
			Self::MinorFix => "minor_fix",
			Self::Other => "other",
		}
	}
}
impl Display for Classification {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Diff payload attached to a change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDiff {
	/// Human-readable summary of the diff.
	pub summary: String,
}

/// Change detected between two snapshots of a source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
	/// Change identifier.
	pub id: u64,
	/// Source the snapshots belong to.
	pub source_id: u64,
	/// Earlier snapshot.
	pub snapshot_id1: u64,
	/// Later snapshot.
	pub snapshot_id2: u64,
	/// Diff between the two snapshots.
	pub diff: ChangeDiff,
	/// Assigned impact classification.
	pub classification: Classification,
	/// Generated explanation of the change.
	pub explanation: String,
	/// Detection time as reported by the server.
	pub timestamp: String,
}

/// Filters accepted by `GET /changes`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeQuery {
	/// Maximum number of changes returned.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub limit: Option<u32>,
	/// Restricts results to one classification.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub classification: Option<Classification>,
}
impl ChangeQuery {
	/// Sets the result limit.
	pub fn with_limit(mut self, limit: u32) -> Self {
		self.limit = Some(limit);

		self
	}

	/// Filters by classification.
	pub fn with_classification(mut self, classification: Classification) -> Self {
		self.classification = Some(classification);

		self
	}
}

/// Cache-first access to `/changes`.
#[derive(Debug)]
pub struct ChangesService {
	resource: CachedResource<Change, ChangeQuery>,
}
impl ChangesService {
	/// Collection endpoint.
	pub const ENDPOINT: &str = "/changes";
	/// Freshness window for cached change lists.
	pub const TTL: Duration = Duration::minutes(5);

	/// Creates the service over `client`, caching lists in `store`.
	pub fn new(client: ApiClient, store: Arc<dyn CacheStore>) -> Self {
		Self { resource: CachedResource::new(client, store, Self::ENDPOINT, Self::TTL) }
	}

	/// Replaces the retry policy of the direct reads.
	pub fn with_backoff(mut self, backoff: Backoff) -> Self {
		self.resource = self.resource.with_backoff(backoff);

		self
	}

	/// Coalesces concurrent cache misses on the same filters.
	pub fn with_single_flight(mut self) -> Self {
		self.resource = self.resource.with_single_flight();

		self
	}

	/// Underlying composite resource.
	pub fn resource(&self) -> &CachedResource<Change, ChangeQuery> {
		&self.resource
	}

	/// Lists changes, cache-first.
	pub async fn get_all(&self, params: Option<&ChangeQuery>) -> Result<Vec<Change>> {
		self.resource.get_all(params).await
	}

	/// Fetches one change; never cached.
	pub async fn get_by_id(&self, id: u64) -> Result<Change> {
		self.resource.get_by_id(id).await
	}

	/// Invalidates the cached list for `params`.
	pub async fn clear_cache(&self, params: Option<&ChangeQuery>) -> Result<()> {
		self.resource.clear_cache(params).await
	}
}
