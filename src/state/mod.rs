pub mod note_sync;

use crate::error::ClientError;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use strum::{AsRefStr, Display};

pub use note_sync::NotesCoordinator;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, AsRefStr)]
pub enum AuthPhase {
    #[default]
    SignedOut,
    /// Only while a sign-in or session check is awaiting the provider.
    Authenticating,
    SignedIn,
}

#[derive(Debug, Default)]
struct SessionData {
    phase: AuthPhase,
    caller_identity: String,
    display_name: String,

    /// Network-bearing operations currently running.
    in_flight: usize,

    /// The one error shown to the user; superseded by the next operation.
    last_error: Option<ClientError>,

    /// Bumped whenever a signed-in session starts or ends.
    epoch: u64,
}

/// Process-wide session state, passed explicitly to every component that
/// reads or drives it.
///
/// Cloning yields another handle to the same session. Readers are public;
/// transitions are crate-private and performed by `AuthSession` and
/// `NotesCoordinator` only.
#[derive(Clone, Debug, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionData>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionData> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> AuthPhase {
        self.read().phase
    }

    pub fn is_signed_in(&self) -> bool {
        self.phase() == AuthPhase::SignedIn
    }

    /// Empty while signed out.
    pub fn caller_identity(&self) -> String {
        self.read().caller_identity.clone()
    }

    pub fn display_name(&self) -> String {
        self.read().display_name.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().in_flight > 0
    }

    pub fn last_error(&self) -> Option<ClientError> {
        self.read().last_error.clone()
    }

    /// Message for the current error, if any.
    pub fn error_message(&self) -> Option<String> {
        self.read().last_error.as_ref().map(ToString::to_string)
    }

    pub fn clear_error(&self) {
        self.write().last_error = None;
    }

    /// Identifies the current signed-in session. A result fetched under one
    /// epoch must not be applied under another.
    pub(crate) fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// True while signed in under `epoch`.
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        let data = self.read();
        data.phase == AuthPhase::SignedIn && data.epoch == epoch
    }

    pub(crate) fn record_error(&self, err: &ClientError) {
        tracing::warn!(error = %err, "Operation failed");
        self.write().last_error = Some(err.clone());
    }

    /// Marks one operation as running until the guard drops.
    pub(crate) fn begin_busy(&self) -> BusyGuard {
        self.write().in_flight += 1;
        BusyGuard {
            session: self.clone(),
        }
    }

    pub(crate) fn set_authenticating(&self) {
        let mut data = self.write();
        if data.phase != AuthPhase::SignedIn {
            data.phase = AuthPhase::Authenticating;
        }
    }

    pub(crate) fn mark_signed_in(&self, identity: &str, display_name: String) {
        let mut data = self.write();
        data.phase = AuthPhase::SignedIn;
        data.epoch += 1;
        data.caller_identity = identity.to_string();
        data.display_name = display_name;
    }

    pub(crate) fn set_display_name(&self, display_name: String) {
        self.write().display_name = display_name;
    }

    /// Back to the initial signed-out state. The current error is kept so
    /// the user still sees why.
    pub(crate) fn reset_signed_out(&self) {
        let mut data = self.write();
        data.phase = AuthPhase::SignedOut;
        data.epoch += 1;
        data.caller_identity.clear();
        data.display_name.clear();
    }
}

/// Decrements the in-flight counter on drop, whichever way the operation
/// ends.
#[must_use = "the session is only busy while the guard is alive"]
pub(crate) struct BusyGuard {
    session: Session,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut data = self.session.write();
        data.in_flight = data.in_flight.saturating_sub(1);
    }
}
