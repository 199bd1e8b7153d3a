//! Session provider contracts consumed by the auth interceptor.
//!
//! The identity provider is external: the client only reads the current access token,
//! asks the provider to sign out after a `401`, and listens for session changes. The
//! [`Navigator`] hook stands in for the UI router so the forced-sign-out flow can send the
//! user to the login entry point without this crate knowing about the UI.

pub mod memory;
pub mod mirror;
pub mod secret;

pub use memory::MemorySessionProvider;
pub use mirror::SessionMirror;
pub use secret::TokenSecret;

// self
use crate::{_prelude::*, error::SessionError};

/// Boxed future returned by [`SessionProvider`] operations.
pub type SessionFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, SessionError>> + 'a + Send>>;

/// Callback invoked when the provider's session changes.
pub type AuthStateListener = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

/// Wraps a closure as an [`AuthStateListener`].
pub fn auth_listener<F>(listener: F) -> AuthStateListener
where
	F: 'static + Fn(AuthEvent, Option<&Session>) + Send + Sync,
{
	Arc::new(listener)
}

/// Handle returned by [`SessionProvider::on_auth_state_change`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Authoritative source of the signed-in user's session.
pub trait SessionProvider
where
	Self: Send + Sync,
{
	/// Returns the current session, if any.
	fn session(&self) -> SessionFuture<'_, Option<Session>>;

	/// Ends the current session.
	fn sign_out(&self) -> SessionFuture<'_, ()>;

	/// Registers a listener for session changes.
	fn on_auth_state_change(&self, listener: AuthStateListener) -> ListenerId;

	/// Removes a listener previously registered with
	/// [`on_auth_state_change`](SessionProvider::on_auth_state_change).
	fn remove_listener(&self, id: ListenerId);
}

/// Moves the UI to another entry point.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Navigates to `path`.
	fn navigate(&self, path: &str);
}

/// Session change notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthEvent {
	/// A user signed in.
	SignedIn,
	/// The session ended.
	SignedOut,
	/// The access token was rotated.
	TokenRefreshed,
}
impl AuthEvent {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthEvent::SignedIn => "signed_in",
			AuthEvent::SignedOut => "signed_out",
			AuthEvent::TokenRefreshed => "token_refreshed",
		}
	}
}
impl Display for AuthEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token bundle issued by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Bearer token attached to protected requests.
	pub access_token: Option<TokenSecret>,
	/// Refresh token managed by the provider.
	pub refresh_token: Option<TokenSecret>,
	/// Identifier of the signed-in user.
	pub user_id: Option<String>,
	/// Expiry instant reported by the provider.
	pub expires_at: Option<OffsetDateTime>,
}
impl Session {
	/// Creates a session holding only an access token.
	pub fn with_access_token(token: impl Into<String>) -> Self {
		Self {
			access_token: Some(TokenSecret::new(token)),
			refresh_token: None,
			user_id: None,
			expires_at: None,
		}
	}

	/// Attaches the user identifier.
	pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());

		self
	}

	/// Returns the access token when present and non-blank.
	pub fn bearer(&self) -> Option<&TokenSecret> {
		self.access_token.as_ref().filter(|token| !token.is_empty())
	}
}
