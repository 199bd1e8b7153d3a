//! User-curated changelogs. Plain request/response calls; nothing here is cached.

// self
use crate::{
	_prelude::*,
	http::ApiClient,
	services::{Change, Classification},
};

/// Server message returned when a protected action runs without a session.
pub const NO_ACTIVE_SESSION: &str = "No active session found";

/// Provider summary embedded in changelog payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogProvider {
	/// Provider identifier.
	pub id: u64,
	/// Display name.
	pub name: String,
}

/// Changelog owned by the signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changelog {
	/// Numeric key used by owner-side routes.
	pub id: u64,
	/// Display name.
	pub name: String,
	/// Public identifier used by share links.
	pub changelog_id: String,
	/// Whether the changelog can be viewed without signing in.
	pub is_public: bool,
	/// Creation time.
	pub created_at: String,
	/// Last update time.
	pub updated_at: String,
	/// Providers aggregated into the changelog.
	#[serde(default)]
	pub providers: Vec<ChangelogProvider>,
}

/// Page metadata for change listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
	/// Total number of matching changes.
	pub total: u64,
	/// Current page, starting at 1.
	pub page: u64,
	/// Page size.
	pub limit: u64,
	/// Number of pages.
	pub pages: u64,
}

/// Changelog together with one page of its changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogWithChanges {
	/// Changelog metadata.
	#[serde(flatten)]
	pub changelog: Changelog,
	/// Changes on the requested page.
	#[serde(default)]
	pub changes: Vec<Change>,
	/// Page metadata.
	pub pagination: Pagination,
}

/// Anonymous view of a shared changelog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicChangelog {
	/// Public identifier.
	pub changelog_id: String,
	/// Display name.
	pub name: String,
	/// Providers aggregated into the changelog.
	#[serde(default)]
	pub providers: Vec<ChangelogProvider>,
	/// Changes on the requested page.
	#[serde(default)]
	pub changes: Vec<Change>,
	/// Creation time.
	pub created_at: String,
	/// Page metadata.
	pub pagination: Pagination,
}

/// Paging and filtering for change listings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangelogQuery {
	/// Page to return, starting at 1.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub page: Option<u32>,
	/// Page size.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub limit: Option<u32>,
	/// Restricts changes to one classification.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub classification: Option<Classification>,
}

/// Body of `POST /changelogs`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewChangelog {
	/// Display name.
	pub name: String,
	/// Providers to aggregate.
	pub provider_ids: Vec<u64>,
}

/// Body of `PUT /changelogs/{id}`; unset fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangelogUpdate {
	/// New display name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Replacement provider list.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub provider_ids: Option<Vec<u64>>,
	/// New visibility.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub is_public: Option<bool>,
}

/// Share link returned by `POST /changelogs/{id}/share`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ShareLink {
	/// Public URL of the changelog.
	pub share_url: String,
}

#[derive(Deserialize)]
struct PublicStatus {
	is_public: bool,
}

/// CRUD and sharing for `/changelogs`.
#[derive(Clone, Debug)]
pub struct ChangelogsService {
	client: ApiClient,
}
impl ChangelogsService {
	/// Collection endpoint.
	pub const ENDPOINT: &str = "/changelogs";

	/// Creates the service over `client`.
	pub fn new(client: ApiClient) -> Self {
		Self { client }
	}

	/// Lists the signed-in user's changelogs.
	pub async fn get_all(&self) -> Result<Vec<Changelog>> {
		self.client
			.get::<_, JsonValue>(Self::ENDPOINT, None)
			.await
			.map_err(|e| map_api_error(e, "Failed to fetch changelogs"))
	}

	/// Fetches a changelog with one page of its changes.
	pub async fn get_by_id(
		&self,
		id: u64,
		params: Option<&ChangelogQuery>,
	) -> Result<ChangelogWithChanges> {
		self.client
			.get(&format!("{}/{id}", Self::ENDPOINT), params)
			.await
			.map_err(|e| map_api_error(e, &format!("Failed to fetch changelog with ID {id}")))
	}

	/// Fetches changelog metadata only.
	pub async fn get(&self, id: u64) -> Result<Changelog> {
		self.client
			.get::<_, JsonValue>(&format!("{}/id/{id}", Self::ENDPOINT), None)
			.await
			.map_err(|e| map_api_error(e, &format!("Failed to fetch changelog with ID {id}")))
	}

	/// Creates a changelog.
	pub async fn create(&self, data: &NewChangelog) -> Result<Changelog> {
		self.client
			.post(Self::ENDPOINT, Some(data))
			.await
			.map_err(|e| map_api_error(e, "Failed to create changelog"))
	}

	/// Updates name, providers, or visibility of the changelog with numeric `id`.
	pub async fn update(&self, id: u64, data: &ChangelogUpdate) -> Result<Changelog> {
		self.client
			.put(&format!("{}/{id}", Self::ENDPOINT), data)
			.await
			.map_err(|e| map_api_error(e, &format!("Failed to update changelog with ID {id}")))
	}

	/// Deletes the changelog with numeric `id`.
	pub async fn delete(&self, id: u64) -> Result<()> {
		self.client
			.delete(&format!("{}/{id}", Self::ENDPOINT))
			.await
			.map_err(|e| map_api_error(e, &format!("Failed to delete changelog with ID {id}")))
	}

	/// Generates a share URL for the changelog with numeric `id`.
	pub async fn share(&self, id: u64) -> Result<ShareLink> {
		self.client
			.post::<_, JsonValue>(&format!("{}/{id}/share", Self::ENDPOINT), None)
			.await
			.map_err(|e| {
				map_api_error(e, &format!("Failed to generate share URL for changelog with ID {id}"))
			})
	}

	/// Fetches a shared changelog by its public identifier.
	pub async fn get_public(
		&self,
		changelog_id: &str,
		params: Option<&ChangelogQuery>,
	) -> Result<PublicChangelog> {
		self.client
			.get(&format!("{}/public/{changelog_id}", Self::ENDPOINT), params)
			.await
			.map_err(|e| {
				map_api_error(e, &format!("Failed to fetch public changelog with ID {changelog_id}"))
			})
	}

	/// Whether the changelog with public identifier `changelog_id` is shared.
	pub async fn is_public(&self, changelog_id: &str) -> Result<bool> {
		self.client
			.get::<PublicStatus, JsonValue>(
				&format!("{}/public/{changelog_id}/is_public", Self::ENDPOINT),
				None,
			)
			.await
			.map(|status| status.is_public)
			.map_err(|e| {
				map_api_error(
					e,
					&format!("Failed to fetch public status for changelog with ID {changelog_id}"),
				)
			})
	}
}

/// Logs `err` under `context` and maps the missing-session message to [`Error::NotSignedIn`].
pub fn map_api_error(err: Error, context: &str) -> Error {
	tracing::error!(status = ?err.status(), error = %err, "{context}.");

	if err.server_message() == Some(NO_ACTIVE_SESSION) { Error::NotSignedIn } else { err }
}
