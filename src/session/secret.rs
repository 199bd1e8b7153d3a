//! Access and refresh tokens held by a [`Session`](crate::session::Session).

// self
use crate::_prelude::*;

/// Session token that never prints its value.
///
/// Serializes as the bare string so provider payloads round-trip unchanged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	const MASK: &str = "<redacted>";

	/// Wraps a token issued by the identity provider.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw token value, for building request headers only.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// `Authorization` header value carrying this token.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.0.trim())
	}

	/// Whether the token is missing or whitespace.
	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret({})", Self::MASK)
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(Self::MASK)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::session::Session;

	#[test]
	fn logged_sessions_hide_tokens() {
		let session = Session::with_access_token("eyJhbGciOi.access").with_user_id("user-1");
		let rendered = format!("{session:?}");

		assert!(!rendered.contains("eyJhbGciOi"));
		assert!(rendered.contains("TokenSecret(<redacted>)"));
		assert!(rendered.contains("user-1"));
	}

	#[test]
	fn bearer_header_trims_provider_whitespace() {
		let token = TokenSecret::new(" abc.def \n");

		assert_eq!(token.bearer_header(), "Bearer abc.def");
		assert!(TokenSecret::new("\t").is_empty());
	}

	#[test]
	fn provider_payload_keeps_plain_strings() {
		let session: Session = serde_json::from_value(json!({
			"access_token": "token-1",
			"refresh_token": null,
			"user_id": null,
			"expires_at": null
		}))
		.expect("Session payload should decode.");

		assert_eq!(session.bearer().map(TokenSecret::expose), Some("token-1"));
		assert_eq!(
			serde_json::to_value(&session).expect("Session should serialize.")["access_token"],
			"token-1"
		);
	}
}
