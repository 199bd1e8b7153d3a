//! Observability helpers for cached and rate-limited calls.
//!
//! # Feature Flags
//!
//! - Spans named `changelog_client.call` carry the `kind` and `endpoint` fields; events are
//!   emitted through `tracing` and need a subscriber installed by the embedding application.
//! - Enable `metrics` to increment `changelog_client_call_total` (labeled by `kind` +
//!   `outcome`), `changelog_client_cache_total` (labeled by `endpoint` + `outcome`), and
//!   `changelog_client_retry_total` (labeled by `endpoint`).

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Call paths observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Cache-first read through [`CachedApiService`](crate::cache::CachedApiService).
	CacheGet,
	/// Direct call wrapped in exponential backoff.
	RateLimited,
	/// Direct call taken after the cache path failed.
	Fallback,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::CacheGet => "cache_get",
			CallKind::RateLimited => "rate_limited",
			CallKind::Fallback => "fallback",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a call path.
	Attempt,
	/// Another attempt after a rate-limit failure.
	Retry,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Retry => "retry",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Result of consulting the persisted cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
	/// A fresh entry was returned.
	Hit,
	/// No usable entry existed.
	Miss,
	/// An entry existed but its TTL had elapsed.
	Stale,
}
impl CacheOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheOutcome::Hit => "hit",
			CacheOutcome::Miss => "miss",
			CacheOutcome::Stale => "stale",
		}
	}
}
impl Display for CacheOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
