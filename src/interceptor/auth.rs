//! Bearer-token injection and forced sign-out on `401`.

// self
use crate::{
	_prelude::*,
	config::{ClientConfig, PublicRoutes},
	http::ApiRequest,
	interceptor::{HookFuture, InterceptorFuture, RequestInterceptor, ResponseInterceptor},
	session::{Navigator, SessionProvider},
};

/// Auth interceptor registered on both chains of the [`ApiClient`](crate::http::ApiClient).
///
/// Requests whose path starts with a public prefix pass through untouched. Every other
/// request asks the [`SessionProvider`] for the current session and, when it carries an
/// access token, attaches `Authorization: Bearer <token>`. A failed session lookup is logged
/// and the request proceeds without credentials so the server decides.
///
/// On a `401` response the interceptor signs the session out and navigates to the login
/// path exactly once per observed failure; the original error still reaches the caller.
pub struct AuthInterceptor {
	session: Arc<dyn SessionProvider>,
	navigator: Arc<dyn Navigator>,
	public_routes: PublicRoutes,
	login_path: String,
}
impl AuthInterceptor {
	/// Creates an interceptor using the public routes and login path from `config`.
	pub fn new(
		session: Arc<dyn SessionProvider>,
		navigator: Arc<dyn Navigator>,
		config: &ClientConfig,
	) -> Self {
		Self {
			session,
			navigator,
			public_routes: config.public_routes.clone(),
			login_path: config.login_path.clone(),
		}
	}

	async fn authorize(&self, request: &mut ApiRequest) {
		if self.public_routes.is_public(&request.path) {
			return;
		}

		match self.session.session().await {
			Ok(Some(session)) =>
				if let Some(token) = session.bearer() {
					request.set_header(ApiRequest::AUTHORIZATION, token.bearer_header());
				},
			Ok(None) => {
				tracing::debug!(path = %request.path, "No active session; sending request anonymously.");
			},
			Err(err) => {
				tracing::warn!(
					path = %request.path,
					error = %err,
					"Session lookup failed; sending request without credentials."
				);
			},
		}
	}

	async fn handle_unauthorized(&self) {
		tracing::warn!(login_path = %self.login_path, "Unauthorized response; signing out.");

		if let Err(err) = self.session.sign_out().await {
			tracing::warn!(error = %err, "Forced sign-out failed.");
		}

		self.navigator.navigate(&self.login_path);
	}
}
impl RequestInterceptor for AuthInterceptor {
	fn intercept<'a>(&'a self, request: &'a mut ApiRequest) -> InterceptorFuture<'a> {
		Box::pin(async move {
			self.authorize(request).await;

			Ok(())
		})
	}
}
impl ResponseInterceptor for AuthInterceptor {
	fn on_failure<'a>(&'a self, error: &'a Error) -> HookFuture<'a> {
		Box::pin(async move {
			if error.is_unauthorized() {
				self.handle_unauthorized().await;
			}
		})
	}
}
impl Debug for AuthInterceptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthInterceptor")
			.field("public_routes", &self.public_routes)
			.field("login_path", &self.login_path)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		error::SessionError,
		session::{AuthStateListener, ListenerId, MemorySessionProvider, Session, SessionFuture},
	};

	#[derive(Default)]
	struct RecordingNavigator(Mutex<Vec<String>>);
	impl Navigator for RecordingNavigator {
		fn navigate(&self, path: &str) {
			self.0.lock().push(path.to_owned());
		}
	}

	struct BrokenProvider;
	impl SessionProvider for BrokenProvider {
		fn session(&self) -> SessionFuture<'_, Option<Session>> {
			Box::pin(async { Err(SessionError::Provider { message: "offline".into() }) })
		}

		fn sign_out(&self) -> SessionFuture<'_, ()> {
			Box::pin(async { Err(SessionError::Provider { message: "offline".into() }) })
		}

		fn on_auth_state_change(&self, _listener: AuthStateListener) -> ListenerId {
			ListenerId(0)
		}

		fn remove_listener(&self, _id: ListenerId) {}
	}

	fn interceptor(
		session: Arc<dyn SessionProvider>,
	) -> (AuthInterceptor, Arc<RecordingNavigator>) {
		let navigator = Arc::new(RecordingNavigator::default());

		(AuthInterceptor::new(session, navigator.clone(), &ClientConfig::default()), navigator)
	}

	#[tokio::test]
	async fn protected_routes_receive_bearer_token() {
		let provider = Arc::new(MemorySessionProvider::signed_in(Session::with_access_token(
			"token-123",
		)));
		let (auth, _) = interceptor(provider);
		let mut request = ApiRequest::get("/changelogs");

		auth.intercept(&mut request).await.expect("Interceptor should not fail.");

		assert_eq!(request.header(ApiRequest::AUTHORIZATION), Some("Bearer token-123"));
	}

	#[tokio::test]
	async fn public_routes_skip_session_lookup() {
		let (auth, _) = interceptor(Arc::new(BrokenProvider));
		let mut request = ApiRequest::get("/changes/7");

		auth.intercept(&mut request).await.expect("Interceptor should not fail.");

		assert_eq!(request.header(ApiRequest::AUTHORIZATION), None);
	}

	#[tokio::test]
	async fn session_failure_lets_request_proceed() {
		let (auth, _) = interceptor(Arc::new(BrokenProvider));
		let mut request = ApiRequest::get("/alert-subscriptions");

		auth.intercept(&mut request)
			.await
			.expect("Session failures must not block the request.");

		assert!(request.headers.is_empty());
	}

	#[tokio::test]
	async fn unauthorized_failure_signs_out_and_redirects_once() {
		let provider =
			Arc::new(MemorySessionProvider::signed_in(Session::with_access_token("stale")));
		let (auth, navigator) = interceptor(provider.clone());
		let err = Error::Unauthorized { message: "jwt expired".into() };

		auth.on_failure(&err).await;

		assert_eq!(provider.sign_out_count(), 1);
		assert_eq!(navigator.0.lock().as_slice(), &["/login".to_string()]);

		auth.on_failure(&Error::Http { status: 500, message: "boom".into() }).await;

		assert_eq!(provider.sign_out_count(), 1);
		assert_eq!(navigator.0.lock().len(), 1);
	}

	#[tokio::test]
	async fn failed_sign_out_still_redirects() {
		let (auth, navigator) = interceptor(Arc::new(BrokenProvider));

		auth.on_failure(&Error::Unauthorized { message: "nope".into() }).await;

		assert_eq!(navigator.0.lock().as_slice(), &["/login".to_string()]);
	}
}
