use crate::api::{CreateNoteRequest, NotesApi, UpdateNoteRequest};
use crate::auth::AuthError;
use crate::error::{ClientError, ClientResult};
use crate::models::{Note, NoteInput};
use crate::query::{self, NoteQuery};
use crate::state::Session;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Owner of the signed-in caller's note collection.
///
/// Responsibilities:
/// - the only caller of the Notes API for list/create/update/delete
/// - reload-after-mutation: a successful create or update is followed by a
///   full re-list that replaces the collection wholesale
/// - delete removes the entry locally without re-listing
/// - busy flag and current-error bookkeeping on the shared [`Session`]
///
/// - never holding notes outside a signed-in session: a listing that
///   completes after the session ended is discarded
///
/// Non-responsibilities:
/// - ordering concurrent mutations. Overlapping calls each re-list, and the
///   collection ends up as whichever listing lands last.
#[derive(Clone)]
pub struct NotesCoordinator {
    api: Arc<dyn NotesApi>,
    session: Session,
    notes: Arc<RwLock<Vec<Note>>>,
}

impl NotesCoordinator {
    pub fn new(api: Arc<dyn NotesApi>, session: Session) -> Self {
        Self {
            api,
            session,
            notes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Snapshot of the collection in server order.
    pub fn notes(&self) -> Vec<Note> {
        self.notes.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.notes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_by_id(&self, note_id: &str) -> Option<Note> {
        self.notes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|n| n.note_id == note_id)
            .cloned()
    }

    /// Exact `categoryId` match; no pseudo-category handling.
    pub fn get_by_category(&self, category_id: &str) -> Vec<Note> {
        self.notes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| n.category_id == category_id)
            .cloned()
            .collect()
    }

    /// The filtered, newest-first view for a screen.
    pub fn view(&self, q: &NoteQuery, now: DateTime<Utc>) -> Vec<Note> {
        let notes = self.notes.read().unwrap_or_else(PoisonError::into_inner);
        query::filter_notes(&notes, q, now)
    }

    fn replace(&self, notes: Vec<Note>) {
        *self.notes.write().unwrap_or_else(PoisonError::into_inner) = notes;
    }

    /// Drops every cached note. Called when the session ends.
    pub(crate) fn clear(&self) {
        self.replace(Vec::new());
    }

    fn fail<T>(&self, err: impl Into<ClientError>) -> ClientResult<T> {
        let err = err.into();
        self.session.record_error(&err);
        Err(err)
    }

    /// Epoch of the signed-in session, or a recorded `Auth` error.
    fn require_signed_in(&self) -> ClientResult<u64> {
        let epoch = self.session.epoch();
        if self.session.is_current(epoch) {
            Ok(epoch)
        } else {
            self.fail(AuthError::new("Not signed in"))
        }
    }

    /// Fetch every note of the caller and replace the local collection.
    ///
    /// On failure the previous collection is left untouched. If the session
    /// ends while the request is out, the listing is dropped and nothing is
    /// recorded.
    pub async fn list(&self) -> ClientResult<Vec<Note>> {
        self.session.clear_error();
        let epoch = self.require_signed_in()?;
        let _busy = self.session.begin_busy();

        let fetched = match self.api.list_notes().await {
            Ok(notes) => notes,
            Err(e) if self.session.is_current(epoch) => return self.fail(e),
            Err(e) => return Err(e.into()),
        };

        let notes = dedupe_by_note_id(fetched);
        {
            // Checked under the collection lock. Sign-out resets the session
            // before it clears the collection.
            let mut current = self.notes.write().unwrap_or_else(PoisonError::into_inner);
            if !self.session.is_current(epoch) {
                tracing::debug!(count = notes.len(), "Discarding notes listed for an ended session");
                return Err(AuthError::new("Session ended before notes loaded").into());
            }
            *current = notes.clone();
        }
        tracing::debug!(count = notes.len(), "Loaded notes");
        Ok(notes)
    }

    /// Create a note, then reload the collection.
    ///
    /// A blank title fails with [`ClientError::Validation`] before any
    /// request; the current error is cleared and nothing is recorded. A
    /// failed reload after a successful create still counts as success; the
    /// reload error is recorded on the session.
    pub async fn create(&self, input: NoteInput) -> ClientResult<()> {
        self.session.clear_error();
        let input = input.normalized()?;
        self.require_signed_in()?;

        let _busy = self.session.begin_busy();

        let req = CreateNoteRequest::from(input);
        if let Err(e) = self.api.create_note(&req).await {
            return self.fail(e);
        }
        tracing::info!(title = %req.title, category = %req.category_id, "Note created");

        self.reload_after_mutation().await;
        Ok(())
    }

    /// Update a note, then reload the collection. Same guards as
    /// [`NotesCoordinator::create`].
    pub async fn update(&self, note_id: &str, input: NoteInput) -> ClientResult<()> {
        self.session.clear_error();
        if note_id.trim().is_empty() {
            return Err(ClientError::validation("note id must not be empty"));
        }
        let input = input.normalized()?;
        self.require_signed_in()?;

        let _busy = self.session.begin_busy();

        let req = UpdateNoteRequest::new(note_id, input);
        if let Err(e) = self.api.update_note(&req).await {
            return self.fail(e);
        }
        tracing::info!(note_id = %note_id, "Note updated");

        self.reload_after_mutation().await;
        Ok(())
    }

    /// Delete a note and drop it from the local collection.
    ///
    /// No reload: nothing server-generated needs reconciling.
    pub async fn delete(&self, note_id: &str) -> ClientResult<()> {
        self.session.clear_error();
        if note_id.trim().is_empty() {
            return Err(ClientError::validation("note id must not be empty"));
        }
        self.require_signed_in()?;

        let _busy = self.session.begin_busy();

        if let Err(e) = self.api.delete_note(note_id).await {
            return self.fail(e);
        }

        self.notes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|n| n.note_id != note_id);
        tracing::info!(note_id = %note_id, "Note deleted");
        Ok(())
    }

    async fn reload_after_mutation(&self) {
        if let Err(e) = self.list().await {
            tracing::warn!(error = %e, "Reload after mutation failed; keeping previous notes");
        }
    }
}

/// Keeps the first position of each `noteId`, with the last occurrence's
/// data.
fn dedupe_by_note_id(notes: Vec<Note>) -> Vec<Note> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(notes.len());
    let mut out: Vec<Note> = Vec::with_capacity(notes.len());

    for n in notes {
        match index.get(&n.note_id) {
            Some(&i) => {
                tracing::warn!(note_id = %n.note_id, "Duplicate note id in listing");
                out[i] = n;
            }
            None => {
                index.insert(n.note_id.clone(), out.len());
                out.push(n);
            }
        }
    }

    out
}
