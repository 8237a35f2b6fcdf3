//! Session and note-sync core for the TypeNote client.
//!
//! [`AuthSession`] gates everything on a signed-in caller; once signed in,
//! [`NotesCoordinator`] owns the caller's notes and keeps them in step with
//! the remote store. [`query`] turns the collection into what a screen
//! shows. The host application supplies a `tracing` subscriber if it wants
//! logs.

pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod query;
pub mod state;
pub mod storage;
pub mod taxonomy;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use api::{ApiClient, ApiError, ApiErrorKind, EnvConfig, NotesApi};
pub use auth::{AuthError, AuthProvider, AuthSession, HttpAuthProvider};
pub use error::{ClientError, ClientResult};
pub use models::{Note, NoteInput};
pub use query::{ActivitySummary, NoteQuery};
pub use state::{AuthPhase, NotesCoordinator, Session};
pub use storage::{JsonFileStore, MemoryStore, PreferenceStore};

/// Wire the HTTP notes client and identity adapter against one origin,
/// sharing a single access token and preference store.
pub fn connect(config: &EnvConfig, prefs: Arc<dyn PreferenceStore>) -> AuthSession {
    let notes_client = ApiClient::from_config(config);
    let auth_client = ApiClient::from_config(config).with_token(notes_client.token().clone());
    let provider = HttpAuthProvider::new(auth_client).with_token_store(prefs.clone());

    tracing::debug!(api_url = %config.api_url, "Client configured");

    let coordinator = NotesCoordinator::new(Arc::new(notes_client), Session::new());
    AuthSession::new(Arc::new(provider), coordinator, prefs)
}
