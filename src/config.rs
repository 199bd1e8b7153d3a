//! Client configuration: base URL, timeout, public routes, and the login entry point.

// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable that overrides [`ClientConfig::DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "CHANGELOG_API_BASE_URL";

/// Path prefixes exempt from bearer-token injection.
///
/// Matching is by prefix, so `/changes` also covers `/changes/42`. The list must stay in
/// sync with the server's public-route declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicRoutes(Vec<String>);
impl PublicRoutes {
	/// Builds a route set from the provided prefixes.
	pub fn new<I, S>(prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(prefixes.into_iter().map(Into::into).collect())
	}

	/// Returns `true` when `path` starts with any configured prefix.
	pub fn is_public(&self, path: &str) -> bool {
		self.0.iter().any(|prefix| path.starts_with(prefix.as_str()))
	}

	/// Iterates over the configured prefixes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}
}
impl Default for PublicRoutes {
	fn default() -> Self {
		Self::new(["/public", "/changes", "/public-changelogs"])
	}
}

/// Settings for the shared HTTP client and its auth interceptor.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// API base URL; request paths are appended to it.
	pub base_url: String,
	/// Per-request timeout enforced by the transport.
	pub timeout: Duration,
	/// Prefixes that never receive an Authorization header.
	pub public_routes: PublicRoutes,
	/// Navigation target after a forced sign-out.
	pub login_path: String,
	/// Keeps a cookie store so cookie-based auth flows work across origins.
	pub with_credentials: bool,
}
impl ClientConfig {
	/// Base URL used when neither the caller nor the environment supplies one.
	pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/v1";
	/// Default login entry point.
	pub const DEFAULT_LOGIN_PATH: &str = "/login";
	/// Default request timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(10);

	/// Creates a configuration targeting `base_url` with default settings.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			timeout: Self::DEFAULT_TIMEOUT,
			public_routes: PublicRoutes::default(),
			login_path: Self::DEFAULT_LOGIN_PATH.into(),
			with_credentials: true,
		}
	}

	/// Reads the base URL from [`BASE_URL_ENV`], falling back to the default.
	pub fn from_env() -> Self {
		let base_url = std::env::var(BASE_URL_ENV)
			.ok()
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| Self::DEFAULT_BASE_URL.into());

		Self::new(base_url)
	}

	/// Overrides the request timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Replaces the public route prefixes.
	pub fn with_public_routes(mut self, routes: PublicRoutes) -> Self {
		self.public_routes = routes;

		self
	}

	/// Overrides the login entry point.
	pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Enables or disables cookie passthrough.
	pub fn with_credentials(mut self, enabled: bool) -> Self {
		self.with_credentials = enabled;

		self
	}

	/// Joins `path` onto the base URL.
	///
	/// The join is textual so a base path such as `/v1` survives; `Url::join` would drop it.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		let raw = format!(
			"{}/{}",
			self.base_url.trim_end_matches('/'),
			path.trim_start_matches('/')
		);

		Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { url: raw, source })
	}

	/// Timeout as a std duration, rejecting non-positive values.
	pub fn timeout_std(&self) -> Result<std::time::Duration, ConfigError> {
		if self.timeout.is_positive() {
			Ok(self.timeout.unsigned_abs())
		} else {
			Err(ConfigError::NonPositiveTimeout)
		}
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self::new(Self::DEFAULT_BASE_URL)
	}
}
