//! Locally mirrored view of the provider's session.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	session::{ListenerId, Session, SessionProvider, auth_listener},
};

/// Keeps the latest session in sync with a [`SessionProvider`].
///
/// The mirror loads the session once on attach and then follows
/// [`on_auth_state_change`](SessionProvider::on_auth_state_change) events. Dropping the mirror
/// unregisters its listener.
pub struct SessionMirror {
	current: Arc<RwLock<Option<Session>>>,
	provider: Arc<dyn SessionProvider>,
	listener: ListenerId,
}
impl SessionMirror {
	/// Subscribes to `provider` and loads the current session.
	pub async fn attach(provider: Arc<dyn SessionProvider>) -> Result<Self> {
		let current = Arc::new(RwLock::new(None));
		let observed = Arc::new(AtomicBool::new(false));
		let listener = {
			let current = current.clone();
			let observed = observed.clone();

			provider.on_auth_state_change(auth_listener(move |event, session| {
				tracing::debug!(%event, "Session changed.");

				observed.store(true, Ordering::Release);
				*current.write() = session.cloned();
			}))
		};
		let mirror = Self { current, provider, listener };
		let initial = mirror.provider.session().await?;

		// An event that raced the initial lookup is newer than the lookup result.
		if !observed.load(Ordering::Acquire) {
			*mirror.current.write() = initial;
		}

		Ok(mirror)
	}

	/// Returns a snapshot of the mirrored session.
	pub fn current(&self) -> Option<Session> {
		self.current.read().clone()
	}

	/// Whether a session is currently present.
	pub fn is_signed_in(&self) -> bool {
		self.current.read().is_some()
	}
}
impl Drop for SessionMirror {
	fn drop(&mut self) {
		self.provider.remove_listener(self.listener);
	}
}
impl Debug for SessionMirror {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionMirror").field("signed_in", &self.is_signed_in()).finish()
	}
}
