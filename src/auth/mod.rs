//! Authentication gate in front of the note collection.

pub mod http;
pub mod validation;

use crate::error::{ClientError, ClientResult};
use crate::state::{NotesCoordinator, Session};
use crate::storage::{self, PreferenceStore, StorageError};
use crate::util;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use http::HttpAuthProvider;

/// Rejection reported by the identity provider, surfaced verbatim.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type SignUpAttributes = BTreeMap<String, String>;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignInOutcome {
    pub is_signed_in: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub is_signed_in: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub identity: String,
}

/// External identity provider: account creation, verification and session
/// issuance.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(
        &self,
        identity: &str,
        secret: &str,
        attributes: &SignUpAttributes,
    ) -> Result<(), AuthError>;
    async fn confirm_sign_up(&self, identity: &str, code: &str) -> Result<(), AuthError>;
    async fn sign_in(&self, identity: &str, secret: &str) -> Result<SignInOutcome, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    async fn fetch_session(&self) -> Result<SessionStatus, AuthError>;
    async fn current_user(&self) -> Result<AuthUser, AuthError>;
}

/// Drives the session through `SignedOut -> Authenticating -> SignedIn` and
/// back, loading notes on entry and dropping them on exit.
#[derive(Clone)]
pub struct AuthSession {
    provider: Arc<dyn AuthProvider>,
    notes: NotesCoordinator,
    prefs: Arc<dyn PreferenceStore>,
}

impl AuthSession {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        notes: NotesCoordinator,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            provider,
            notes,
            prefs,
        }
    }

    pub fn session(&self) -> &Session {
        self.notes.session()
    }

    pub fn notes(&self) -> &NotesCoordinator {
        &self.notes
    }

    fn fail<T>(&self, err: impl Into<ClientError>) -> ClientResult<T> {
        let err = err.into();
        self.session().record_error(&err);
        Err(err)
    }

    /// Request a new account. Does not sign in.
    pub async fn sign_up(&self, identity: &str, secret: &str) -> ClientResult<()> {
        let session = self.session();
        let _busy = session.begin_busy();
        session.clear_error();

        let attributes = SignUpAttributes::from([("email".to_string(), identity.to_string())]);
        match self.provider.sign_up(identity, secret, &attributes).await {
            Ok(()) => {
                tracing::info!(identity = %identity, "Sign-up requested");
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn confirm_sign_up(&self, identity: &str, code: &str) -> ClientResult<()> {
        let session = self.session();
        let _busy = session.begin_busy();
        session.clear_error();

        match self.provider.confirm_sign_up(identity, code).await {
            Ok(()) => {
                tracing::info!(identity = %identity, "Sign-up confirmed");
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Sign in and load the caller's notes.
    ///
    /// Completes only after the note list has been fetched. A failed load
    /// leaves the caller signed in, with the load error recorded.
    pub async fn sign_in(&self, identity: &str, secret: &str) -> ClientResult<()> {
        let session = self.session();
        let _busy = session.begin_busy();
        session.clear_error();

        let was_signed_in = session.is_signed_in();
        session.set_authenticating();

        let err = match self.provider.sign_in(identity, secret).await {
            Ok(outcome) if outcome.is_signed_in => {
                self.establish(identity).await;
                tracing::info!(identity = %identity, "Signed in");
                return Ok(());
            }
            Ok(_) => AuthError::new("Sign-in is not complete; confirm the account first"),
            Err(e) => e,
        };

        if !was_signed_in {
            session.reset_signed_out();
        }
        self.fail(err)
    }

    /// Sign out and forget every cached note.
    ///
    /// Local state is reset even when the provider call fails; the failure
    /// is still reported.
    pub async fn sign_out(&self) -> ClientResult<()> {
        let session = self.session();
        let _busy = session.begin_busy();
        session.clear_error();

        let result = self.provider.sign_out().await;

        session.reset_signed_out();
        self.notes.clear();

        match result {
            Ok(()) => {
                tracing::info!("Signed out");
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Restore an existing provider session at startup.
    ///
    /// Never fails: any provider error resolves to signed out. Returns
    /// whether a session was restored.
    pub async fn check_session(&self) -> bool {
        let session = self.session();
        let _busy = session.begin_busy();
        session.clear_error();
        session.set_authenticating();

        match self.restorable_identity().await {
            Some(identity) => {
                self.establish(&identity).await;
                tracing::info!(identity = %identity, "Session restored");
                true
            }
            None => {
                session.reset_signed_out();
                self.notes.clear();
                false
            }
        }
    }

    async fn restorable_identity(&self) -> Option<String> {
        match self.provider.fetch_session().await {
            Ok(status) if status.is_signed_in => {}
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Session check failed");
                return None;
            }
        }

        match self.provider.current_user().await {
            Ok(user) if !user.identity.trim().is_empty() => Some(user.identity),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Current user lookup failed");
                None
            }
        }
    }

    async fn establish(&self, identity: &str) {
        let display_name = self.resolve_display_name(identity);
        self.session().mark_signed_in(identity, display_name);

        if let Err(e) = self.notes.list().await {
            tracing::warn!(error = %e, "Initial note load failed");
        }
    }

    fn resolve_display_name(&self, identity: &str) -> String {
        storage::load_display_name(self.prefs.as_ref())
            .unwrap_or_else(|| util::display_name_from_identity(identity))
    }

    /// Persist a user-chosen display name. Blank names are ignored and
    /// return `Ok(false)`.
    pub fn save_display_name(&self, name: &str) -> Result<bool, StorageError> {
        match storage::save_display_name(self.prefs.as_ref(), name)? {
            Some(saved) => {
                self.session().set_display_name(saved);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn initials(&self) -> String {
        util::initials(&self.session().display_name())
    }
}
