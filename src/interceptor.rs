//! Request and response interceptor chains run by [`ApiClient`](crate::http::ApiClient).
//!
//! Request interceptors run in registration order before the transport sees the request and
//! may rewrite it; an error aborts the request. Response interceptors run in registration
//! order after status classification and before the caller sees the result. They observe the
//! outcome for side effects only and cannot replace it.

pub mod auth;

pub use auth::AuthInterceptor;

// self
use crate::{
	_prelude::*,
	http::{ApiRequest, ApiResponse},
};

/// Boxed future returned by [`RequestInterceptor::intercept`].
pub type InterceptorFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Boxed future returned by [`ResponseInterceptor`] hooks.
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Hook that can rewrite outgoing requests.
pub trait RequestInterceptor
where
	Self: Send + Sync,
{
	/// Inspects or rewrites `request` before it is sent.
	fn intercept<'a>(&'a self, request: &'a mut ApiRequest) -> InterceptorFuture<'a>;
}

/// Hook that observes classified responses.
pub trait ResponseInterceptor
where
	Self: Send + Sync,
{
	/// Called with every 2xx response. Defaults to a no-op.
	fn on_success<'a>(&'a self, response: &'a ApiResponse) -> HookFuture<'a> {
		let _ = response;

		Box::pin(async {})
	}

	/// Called with every failure, including classified non-2xx statuses.
	fn on_failure<'a>(&'a self, error: &'a Error) -> HookFuture<'a>;
}
