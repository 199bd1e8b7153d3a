//! Client-level error types shared across the transport, cache, and service layers.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP status the backoff wrapper treats as retryable.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;
/// HTTP status that triggers the forced sign-out flow.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Persisted cache store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Session provider failure.
	#[error(transparent)]
	Session(#[from] SessionError),

	/// Server rejected the request as unauthenticated (`401`).
	#[error("Request was rejected as unauthorized: {message}.")]
	Unauthorized {
		/// Server-supplied message or body preview.
		message: String,
	},
	/// Any other non-success HTTP status.
	#[error("Request failed with HTTP {status}: {message}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Server-supplied message or body preview.
		message: String,
	},
	/// Response body could not be decoded into the expected type.
	#[error("Response body returned by HTTP {status} is malformed.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
	/// The server reported that no session is active for a protected action.
	#[error("You need to be logged in to perform this action.")]
	NotSignedIn,
}
impl Error {
	/// Returns the HTTP status code associated with the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Transient(TransientError::RateLimited { .. }) => Some(STATUS_TOO_MANY_REQUESTS),
			Self::Unauthorized { .. } => Some(STATUS_UNAUTHORIZED),
			Self::Http { status, .. } | Self::Decode { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Whether the failure is the rate-limit signal the backoff wrapper retries.
	pub fn is_rate_limited(&self) -> bool {
		self.status() == Some(STATUS_TOO_MANY_REQUESTS)
	}

	/// Whether the failure is an unauthorized response.
	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(STATUS_UNAUTHORIZED)
	}

	/// Server-supplied message carried by HTTP failures.
	pub fn server_message(&self) -> Option<&str> {
		match self {
			Self::Unauthorized { message } | Self::Http { message, .. } => Some(message),
			Self::Transient(TransientError::RateLimited { message, .. }) => Some(message),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL or request path cannot be parsed.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request timeout is zero or negative.
	#[error("The request timeout must be positive.")]
	NonPositiveTimeout,
	/// Query parameters must serialize to a JSON object.
	#[error("Query parameters must serialize to an object, got {kind}.")]
	InvalidQuery {
		/// JSON kind produced by the parameters.
		kind: &'static str,
	},
	/// Parameters or request body could not be serialized.
	#[error("Request payload could not be serialized.")]
	Encode(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Server answered `429 Too Many Requests`.
	#[error("Rate limit exceeded: {message}.")]
	RateLimited {
		/// Server-supplied message or body preview.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request timed out while calling the API.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: Box::new(e) } } else { Self::network(e) }
	}
}

/// Failures reported by a [`SessionProvider`](crate::session::SessionProvider).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SessionError {
	/// The provider could not be reached or answered with an error.
	#[error("Session provider failure: {message}.")]
	Provider {
		/// Human-readable error payload.
		message: String,
	},
}
