//! Exponential backoff for rate-limited (`429`) calls.
//!
//! [`with_backoff`] retries a call only while it fails with the rate-limit status. Any other
//! failure, including network errors and other 4xx/5xx statuses, is terminal on the first
//! attempt. Delays double after every retry with no jitter: with the defaults a call that is
//! always throttled is attempted four times with waits of 1 s, 2 s, and 4 s in between.

// self
use crate::{
	_prelude::*,
	obs::{self, CallKind, CallOutcome},
};

/// Boxed future produced by a [`RateLimitedMethod`]'s underlying call.
pub type CallFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

type BoxedMethod<A, T> = Arc<dyn Fn(A) -> CallFuture<T> + Send + Sync>;

/// Retry label used when a call is not bound to an endpoint.
pub const UNLABELED_ENDPOINT: &str = "unlabeled";

/// Retry ceiling and initial delay for [`with_backoff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
	/// Retries allowed after the initial attempt.
	pub max_retries: u32,
	/// Delay before the first retry; doubled after each retry.
	pub initial_delay: Duration,
}
impl Backoff {
	/// Default retry ceiling.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;
	/// Default delay before the first retry.
	pub const DEFAULT_INITIAL_DELAY: Duration = Duration::milliseconds(1_000);

	/// Creates a policy with explicit limits.
	pub const fn new(max_retries: u32, initial_delay: Duration) -> Self {
		Self { max_retries, initial_delay }
	}

	/// Runs `call` until it succeeds, fails with a non-rate-limit error, or exhausts retries.
	pub async fn run<T, F, Fut>(&self, call: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		self.run_for(UNLABELED_ENDPOINT, call).await
	}

	/// Same as [`run`](Self::run); retries are logged and counted under `endpoint`.
	pub async fn run_for<T, F, Fut>(&self, endpoint: &str, mut call: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut state = BackoffState::new(self.initial_delay);

		loop {
			let err = match call().await {
				Ok(value) => return Ok(value),
				Err(err) => err,
			};

			if !err.is_rate_limited() || state.attempt >= self.max_retries {
				return Err(err);
			}

			tracing::warn!(
				%endpoint,
				retry = state.attempt + 1,
				max_retries = self.max_retries,
				delay_ms = state.delay.whole_milliseconds() as i64,
				"Rate limit hit; retrying after delay."
			);
			obs::record_call_outcome(CallKind::RateLimited, CallOutcome::Retry);
			obs::record_retry(endpoint);
			tokio::time::sleep(state.delay.unsigned_abs()).await;
			state.advance();
		}
	}
}
impl Default for Backoff {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_INITIAL_DELAY)
	}
}

/// Per-invocation retry counter and current delay; never shared across calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffState {
	/// Retries performed so far.
	pub attempt: u32,
	/// Delay before the next retry.
	pub delay: Duration,
}
impl BackoffState {
	fn new(initial_delay: Duration) -> Self {
		Self { attempt: 0, delay: initial_delay }
	}

	fn advance(&mut self) {
		self.attempt += 1;
		self.delay = self.delay.saturating_mul(2);
	}
}

/// Runs `call` with exponential backoff on `429`.
pub async fn with_backoff<T, F, Fut>(
	call: F,
	max_retries: u32,
	initial_delay: Duration,
) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	Backoff::new(max_retries, initial_delay).run(call).await
}

/// API method with [`with_backoff`] pre-bound to its calls.
pub struct RateLimitedMethod<A, T> {
	method: BoxedMethod<A, T>,
	backoff: Backoff,
	endpoint: Arc<str>,
}
impl<A, T> RateLimitedMethod<A, T> {
	/// Replaces the retry policy, keeping the underlying call.
	pub fn with_policy(mut self, backoff: Backoff) -> Self {
		self.backoff = backoff;

		self
	}

	/// Labels retries of this method with `endpoint` in logs and metrics.
	pub fn with_endpoint(mut self, endpoint: impl AsRef<str>) -> Self {
		self.endpoint = Arc::from(endpoint.as_ref());

		self
	}

	/// Retry policy bound to this method.
	pub fn backoff(&self) -> Backoff {
		self.backoff
	}

	/// Endpoint label used for retries.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}
impl<A, T> RateLimitedMethod<A, T>
where
	A: 'static + Clone,
	T: 'static,
{
	/// Wraps `method` with the default [`Backoff`].
	pub fn new<F, Fut>(method: F) -> Self
	where
		F: 'static + Fn(A) -> Fut + Send + Sync,
		Fut: 'static + Future<Output = Result<T>> + Send,
	{
		Self::with_backoff(method, Backoff::default())
	}

	/// Wraps `method` with an explicit [`Backoff`].
	pub fn with_backoff<F, Fut>(method: F, backoff: Backoff) -> Self
	where
		F: 'static + Fn(A) -> Fut + Send + Sync,
		Fut: 'static + Future<Output = Result<T>> + Send,
	{
		Self {
			method: Arc::new(move |args| Box::pin(method(args)) as CallFuture<T>),
			backoff,
			endpoint: Arc::from(UNLABELED_ENDPOINT),
		}
	}

	/// Invokes the method, retrying on rate limits. Each attempt receives a clone of `args`.
	pub async fn call(&self, args: A) -> Result<T> {
		self.backoff.run_for(&self.endpoint, || (self.method)(args.clone())).await
	}
}
impl<A, T> Clone for RateLimitedMethod<A, T> {
	fn clone(&self) -> Self {
		Self { method: self.method.clone(), backoff: self.backoff, endpoint: self.endpoint.clone() }
	}
}
impl<A, T> Debug for RateLimitedMethod<A, T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimitedMethod")
			.field("endpoint", &self.endpoint)
			.field("backoff", &self.backoff)
			.finish()
	}
}

/// Creates a rate-limited version of `method` with the given limits.
pub fn create_rate_limited_api_method<A, T, F, Fut>(
	method: F,
	max_retries: u32,
	initial_delay: Duration,
) -> RateLimitedMethod<A, T>
where
	A: 'static + Clone,
	T: 'static,
	F: 'static + Fn(A) -> Fut + Send + Sync,
	Fut: 'static + Future<Output = Result<T>> + Send,
{
	RateLimitedMethod::with_backoff(method, Backoff::new(max_retries, initial_delay))
}
