//! In-process [`SessionProvider`] for embedders, local development, and tests.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	error::SessionError,
	session::{AuthEvent, AuthStateListener, ListenerId, Session, SessionFuture, SessionProvider},
};

/// Session provider that keeps the current session in memory and notifies listeners.
#[derive(Default)]
pub struct MemorySessionProvider {
	session: RwLock<Option<Session>>,
	listeners: Mutex<Vec<(ListenerId, AuthStateListener)>>,
	next_listener: AtomicU64,
	sign_outs: AtomicU64,
}
impl MemorySessionProvider {
	/// Creates a provider that starts with `session` signed in.
	pub fn signed_in(session: Session) -> Self {
		let provider = Self::default();

		*provider.session.write() = Some(session);

		provider
	}

	/// Replaces the current session and emits [`AuthEvent::SignedIn`] or
	/// [`AuthEvent::TokenRefreshed`].
	pub fn set_session(&self, session: Session) {
		let event = {
			let mut guard = self.session.write();
			let event =
				if guard.is_some() { AuthEvent::TokenRefreshed } else { AuthEvent::SignedIn };

			*guard = Some(session.clone());

			event
		};

		self.emit(event, Some(&session));
	}

	/// Returns the number of completed sign-outs.
	pub fn sign_out_count(&self) -> u64 {
		self.sign_outs.load(Ordering::Relaxed)
	}

	fn sign_out_now(&self) {
		self.session.write().take();
		self.sign_outs.fetch_add(1, Ordering::Relaxed);
		self.emit(AuthEvent::SignedOut, None);
	}

	fn emit(&self, event: AuthEvent, session: Option<&Session>) {
		let listeners: Vec<AuthStateListener> =
			self.listeners.lock().iter().map(|(_, listener)| listener.clone()).collect();

		for listener in listeners {
			listener(event, session);
		}
	}
}
impl SessionProvider for MemorySessionProvider {
	fn session(&self) -> SessionFuture<'_, Option<Session>> {
		let current = self.session.read().clone();

		Box::pin(async move { Ok::<_, SessionError>(current) })
	}

	fn sign_out(&self) -> SessionFuture<'_, ()> {
		Box::pin(async move {
			self.sign_out_now();

			Ok(())
		})
	}

	fn on_auth_state_change(&self, listener: AuthStateListener) -> ListenerId {
		let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));

		self.listeners.lock().push((id, listener));

		id
	}

	fn remove_listener(&self, id: ListenerId) {
		self.listeners.lock().retain(|(existing, _)| *existing != id);
	}
}
impl Debug for MemorySessionProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemorySessionProvider")
			.field("signed_in", &self.session.read().is_some())
			.field("listeners", &self.listeners.lock().len())
			.field("sign_outs", &self.sign_out_count())
			.finish()
	}
}
