//! Shared API client with request and response interceptor chains.

// self
use crate::{
	_prelude::*,
	http::{ApiRequest, ApiResponse, ApiTransport, HttpMethod},
	interceptor::{AuthInterceptor, RequestInterceptor, ResponseInterceptor},
};
#[cfg(feature = "reqwest")]
use crate::{
	config::ClientConfig,
	http::ReqwestTransport,
	session::{Navigator, SessionProvider},
};

/// HTTP client core shared by every service.
///
/// The client owns the transport plus two interceptor chains and holds no cache or retry
/// logic itself. Cloning is cheap; clones share the transport and interceptors.
#[derive(Clone)]
pub struct ApiClient {
	transport: Arc<dyn ApiTransport>,
	request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
	response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}
impl ApiClient {
	/// Creates a client over `transport` with empty interceptor chains.
	pub fn with_transport(transport: Arc<dyn ApiTransport>) -> Self {
		Self { transport, request_interceptors: Vec::new(), response_interceptors: Vec::new() }
	}

	/// Appends a request interceptor.
	pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
		self.request_interceptors.push(interceptor);

		self
	}

	/// Appends a response interceptor.
	pub fn with_response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
		self.response_interceptors.push(interceptor);

		self
	}

	/// Registers `auth` on both chains.
	pub fn with_auth(self, auth: Arc<AuthInterceptor>) -> Self {
		self.with_request_interceptor(auth.clone()).with_response_interceptor(auth)
	}

	/// Runs the interceptor chains around a single transport call.
	///
	/// Non-2xx responses are classified into [`Error`] before the response chain runs, so
	/// response interceptors and callers see the same error value.
	pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		for interceptor in &self.request_interceptors {
			interceptor.intercept(&mut request).await?;
		}

		let method = request.method;
		let path = request.path.clone();
		let result = self.transport.execute(request).await.and_then(ApiResponse::into_success);

		match &result {
			Ok(response) => {
				tracing::trace!(%method, %path, status = response.status, "Request succeeded.");

				for interceptor in &self.response_interceptors {
					interceptor.on_success(response).await;
				}
			},
			Err(err) => {
				tracing::debug!(%method, %path, status = ?err.status(), error = %err, "Request failed.");

				for interceptor in &self.response_interceptors {
					interceptor.on_failure(err).await;
				}
			},
		}

		result
	}

	/// `GET path` with `params` encoded as the query string.
	pub async fn get<T, P>(&self, path: &str, params: Option<&P>) -> Result<T>
	where
		T: DeserializeOwned,
		P: ?Sized + Serialize,
	{
		let request = ApiRequest::get(path).with_params(params)?;

		self.send(request).await?.json()
	}

	/// `POST path` with an optional JSON body.
	pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> Result<T>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let mut request = ApiRequest::new(HttpMethod::Post, path);

		if let Some(body) = body {
			request = request.with_json(body)?;
		}

		self.send(request).await?.json()
	}

	/// `PUT path` with a JSON body.
	pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let request = ApiRequest::new(HttpMethod::Put, path).with_json(body)?;

		self.send(request).await?.json()
	}

	/// `DELETE path`, discarding any response body.
	pub async fn delete(&self, path: &str) -> Result<()> {
		self.send(ApiRequest::new(HttpMethod::Delete, path)).await.map(|_| ())
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient {
	/// Builds the default reqwest-backed client with the auth interceptor installed.
	pub fn new(
		config: ClientConfig,
		session: Arc<dyn SessionProvider>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self> {
		let auth = Arc::new(AuthInterceptor::new(session, navigator, &config));
		let transport = ReqwestTransport::new(config)?;

		Ok(Self::with_transport(Arc::new(transport)).with_auth(auth))
	}

	/// Same as [`ApiClient::new`] with [`ClientConfig::from_env`].
	pub fn from_env(
		session: Arc<dyn SessionProvider>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self> {
		Self::new(ClientConfig::from_env(), session, navigator)
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("request_interceptors", &self.request_interceptors.len())
			.field("response_interceptors", &self.response_interceptors.len())
			.finish()
	}
}
