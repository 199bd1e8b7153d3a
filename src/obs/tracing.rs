// crates.io
use tracing::instrument::Instrumented;
// self
use crate::{_prelude::*, obs::CallKind};

/// Span wrapper used around cached and rate-limited calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + endpoint.
	pub fn new(kind: CallKind, endpoint: &str) -> Self {
		Self { span: tracing::info_span!("changelog_client.call", kind = kind.as_str(), endpoint) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		tracing::Instrument::instrument(fut, self.span.clone())
	}
}
