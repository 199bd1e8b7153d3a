//! Transport primitives and the shared API client.
//!
//! [`ApiTransport`] is the client's only dependency on an HTTP stack: it receives a
//! path-relative [`ApiRequest`] and answers with a raw [`ApiResponse`] for any status.
//! [`ApiClient`] layers the interceptor chains and status classification on top, so custom
//! transports (tests, alternative HTTP crates) inherit the same auth and error behavior.

pub mod client;

pub use client::ApiClient;

// crates.io
#[cfg(feature = "reqwest")]
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, STATUS_TOO_MANY_REQUESTS, STATUS_UNAUTHORIZED, TransientError},
	query::NormalizedParams,
};
#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, error::TransportError};

/// Boxed future returned by [`ApiTransport::execute`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute [`ApiRequest`]s.
///
/// Implementations resolve the request path against their base URL, apply their own timeout,
/// and return the response for every status code. Status classification happens in
/// [`ApiClient`], not in the transport.
pub trait ApiTransport
where
	Self: Send + Sync,
{
	/// Sends `request` and returns the raw response.
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// HTTP verbs used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
}
impl HttpMethod {
	/// Returns the wire name of the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Delete => "DELETE",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<HttpMethod> for reqwest::Method {
	fn from(method: HttpMethod) -> Self {
		match method {
			HttpMethod::Get => reqwest::Method::GET,
			HttpMethod::Post => reqwest::Method::POST,
			HttpMethod::Put => reqwest::Method::PUT,
			HttpMethod::Delete => reqwest::Method::DELETE,
		}
	}
}

/// Outgoing request, relative to the client's base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: HttpMethod,
	/// Path appended to the base URL, e.g. `/changes/7`.
	pub path: String,
	/// Query string pairs in send order.
	pub query: Vec<(String, String)>,
	/// Extra headers keyed by lowercase name.
	pub headers: BTreeMap<String, String>,
	/// JSON body bytes.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Header carrying the bearer token.
	pub const AUTHORIZATION: &str = "authorization";

	/// Creates a request without query, headers, or body.
	pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: BTreeMap::new(),
			body: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(HttpMethod::Get, path)
	}

	/// Encodes `params` into the query string; `None` leaves the query empty.
	pub fn with_params<P>(mut self, params: Option<&P>) -> Result<Self, ConfigError>
	where
		P: ?Sized + Serialize,
	{
		if let Some(params) = params {
			self.query = NormalizedParams::new(params)?.pairs();
		}

		Ok(self)
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body)?);

		Ok(self)
	}

	/// Sets a header, replacing any previous value.
	pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
		self.headers.insert(name.to_ascii_lowercase(), value.into());
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}

/// Raw response returned by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a response with a body and no retry hint.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, retry_after: None, body: body.into() }
	}

	/// Whether the status is in the 2xx range.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Passes 2xx responses through and classifies everything else into [`Error`].
	pub fn into_success(self) -> Result<Self> {
		if self.is_success() {
			return Ok(self);
		}

		let message = self.error_message();

		Err(match self.status {
			STATUS_UNAUTHORIZED => Error::Unauthorized { message },
			STATUS_TOO_MANY_REQUESTS =>
				TransientError::RateLimited { message, retry_after: self.retry_after }.into(),
			status => Error::Http { status, message },
		})
	}

	/// Server `message` (or `error`) field, else a bounded body preview.
	fn error_message(&self) -> String {
		if let Ok(JsonValue::Object(map)) = serde_json::from_slice::<JsonValue>(&self.body) {
			if let Some(JsonValue::String(message)) =
				map.get("message").or_else(|| map.get("error"))
			{
				return message.clone();
			}
		}

		String::from_utf8_lossy(&self.body).chars().take(Self::BODY_PREVIEW_LIMIT).collect()
	}
}

/// reqwest-backed transport configured from a [`ClientConfig`].
///
/// The client carries JSON `Content-Type`/`Accept` defaults, the configured timeout, and a
/// cookie store when [`ClientConfig::with_credentials`] is set.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	config: Arc<ClientConfig>,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport and its reqwest client from `config`.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

		let client = ReqwestClient::builder()
			.timeout(config.timeout_std()?)
			.default_headers(headers)
			.cookie_store(config.with_credentials)
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self::with_client(client, config))
	}

	/// Wraps an existing reqwest [`ReqwestClient`]; the caller owns its timeout and headers.
	pub fn with_client(client: ReqwestClient, config: ClientConfig) -> Self {
		Self { client, config: Arc::new(config) }
	}

	/// Configuration the transport resolves paths against.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let mut url = self.config.resolve(&request.path)?;

			if !request.query.is_empty() {
				url.query_pairs_mut().extend_pairs(request.query.iter());
			}

			let mut builder = self.client.request(request.method.into(), url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(ApiResponse { status, retry_after, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
