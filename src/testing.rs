//! In-memory stand-ins for the remote services, shared by unit tests.

use crate::api::{ApiError, ApiErrorKind, ApiResult, CreateNoteRequest, NotesApi, UpdateNoteRequest};
use crate::auth::{AuthError, AuthProvider, AuthUser, SessionStatus, SignInOutcome, SignUpAttributes};
use crate::models::Note;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub(crate) const OWNER: &str = "owner-1";

pub(crate) fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-20T08:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub(crate) fn note(id: &str, created_at: DateTime<Utc>, category_id: &str, title: &str, content: &str) -> Note {
    Note {
        owner_id: OWNER.to_string(),
        note_id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        category_id: category_id.to_string(),
        color_id: None,
        created_at: created_at.to_rfc3339(),
        updated_at: created_at.to_rfc3339(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    List,
    Create,
    Update,
    Delete,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Calls {
    pub list: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.list + self.create + self.update + self.delete
    }
}

#[derive(Default)]
struct FakeServer {
    notes: Vec<Note>,
    next_id: u64,
    calls: Calls,
    failing: HashSet<Op>,
    last_create: Option<CreateNoteRequest>,
    last_update: Option<UpdateNoteRequest>,
}

/// Server-side note store with call counters and per-operation failure
/// switches.
#[derive(Default)]
pub(crate) struct FakeNotesApi {
    server: Mutex<FakeServer>,
}

impl FakeNotesApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(notes: Vec<Note>) -> Self {
        let api = Self::default();
        {
            let mut s = api.server.lock().expect("fake lock");
            s.next_id = notes.len() as u64;
            s.notes = notes;
        }
        api
    }

    pub fn fail(&self, op: Op) {
        self.server.lock().expect("fake lock").failing.insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.server.lock().expect("fake lock").failing.remove(&op);
    }

    pub fn calls(&self) -> Calls {
        self.server.lock().expect("fake lock").calls
    }

    pub fn server_notes(&self) -> Vec<Note> {
        self.server.lock().expect("fake lock").notes.clone()
    }

    /// Adds a note behind the client's back (another device, say).
    pub fn insert_remote(&self, note: Note) {
        self.server.lock().expect("fake lock").notes.push(note);
    }

    pub fn last_create(&self) -> Option<CreateNoteRequest> {
        self.server.lock().expect("fake lock").last_create.clone()
    }

    pub fn last_update(&self) -> Option<UpdateNoteRequest> {
        self.server.lock().expect("fake lock").last_update.clone()
    }
}

fn check(server: &FakeServer, op: Op) -> ApiResult<()> {
    if server.failing.contains(&op) {
        Err(ApiError::new(ApiErrorKind::Network, "connection reset by peer"))
    } else {
        Ok(())
    }
}

#[async_trait]
impl NotesApi for FakeNotesApi {
    async fn list_notes(&self) -> ApiResult<Vec<Note>> {
        let mut s = self.server.lock().expect("fake lock");
        s.calls.list += 1;
        check(&s, Op::List)?;
        Ok(s.notes.clone())
    }

    async fn create_note(&self, req: &CreateNoteRequest) -> ApiResult<()> {
        let mut s = self.server.lock().expect("fake lock");
        s.calls.create += 1;
        check(&s, Op::Create)?;

        s.next_id += 1;
        let created = base_time() + Duration::minutes(s.next_id as i64);
        let id = format!("note-{}", s.next_id);
        let mut n = note(&id, created, &req.category_id, &req.title, &req.content);
        n.color_id = req.color_id.clone();
        s.notes.push(n);
        s.last_create = Some(req.clone());
        Ok(())
    }

    async fn update_note(&self, req: &UpdateNoteRequest) -> ApiResult<()> {
        let mut s = self.server.lock().expect("fake lock");
        s.calls.update += 1;
        check(&s, Op::Update)?;

        let Some(existing) = s.notes.iter_mut().find(|n| n.note_id == req.note_id) else {
            return Err(ApiError::new(ApiErrorKind::Http, "Update note (404 Not Found): no such note"));
        };
        existing.title = req.title.clone();
        existing.content = req.content.clone();
        existing.category_id = req.category_id.clone();
        existing.color_id = req.color_id.clone();
        existing.updated_at = (base_time() + Duration::days(1)).to_rfc3339();
        s.last_update = Some(req.clone());
        Ok(())
    }

    async fn delete_note(&self, note_id: &str) -> ApiResult<()> {
        let mut s = self.server.lock().expect("fake lock");
        s.calls.delete += 1;
        check(&s, Op::Delete)?;

        let before = s.notes.len();
        s.notes.retain(|n| n.note_id != note_id);
        if s.notes.len() == before {
            return Err(ApiError::new(ApiErrorKind::Http, "Delete note (404 Not Found): no such note"));
        }
        Ok(())
    }
}

/// Wraps [`FakeNotesApi`] so `list_notes` waits until the gate is opened.
pub(crate) struct GatedNotesApi {
    inner: FakeNotesApi,
    gate: Arc<Notify>,
}

impl GatedNotesApi {
    pub fn new(inner: FakeNotesApi, gate: Arc<Notify>) -> Self {
        Self { inner, gate }
    }

    pub fn calls(&self) -> Calls {
        self.inner.calls()
    }
}

#[async_trait]
impl NotesApi for GatedNotesApi {
    async fn list_notes(&self) -> ApiResult<Vec<Note>> {
        self.gate.notified().await;
        self.inner.list_notes().await
    }

    async fn create_note(&self, req: &CreateNoteRequest) -> ApiResult<()> {
        self.inner.create_note(req).await
    }

    async fn update_note(&self, req: &UpdateNoteRequest) -> ApiResult<()> {
        self.inner.update_note(req).await
    }

    async fn delete_note(&self, note_id: &str) -> ApiResult<()> {
        self.inner.delete_note(note_id).await
    }
}

pub(crate) const VALID_CODE: &str = "123456";

struct Account {
    secret: String,
    confirmed: bool,
}

#[derive(Default)]
struct FakeIdentity {
    accounts: HashMap<String, Account>,
    signed_in_as: Option<String>,
    fail_sign_out: bool,
    fail_session: bool,
    last_sign_up_attributes: Option<SignUpAttributes>,
}

#[derive(Default)]
pub(crate) struct FakeAuthProvider {
    state: Mutex<FakeIdentity>,
}

impl FakeAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A confirmed account.
    pub fn with_account(self, identity: &str, secret: &str) -> Self {
        self.state.lock().expect("fake lock").accounts.insert(
            identity.to_string(),
            Account {
                secret: secret.to_string(),
                confirmed: true,
            },
        );
        self
    }

    /// A session already persisted by the provider.
    pub fn signed_in_as(self, identity: &str) -> Self {
        self.state.lock().expect("fake lock").signed_in_as = Some(identity.to_string());
        self
    }

    pub fn fail_sign_out(self) -> Self {
        self.state.lock().expect("fake lock").fail_sign_out = true;
        self
    }

    pub fn fail_session(self) -> Self {
        self.state.lock().expect("fake lock").fail_session = true;
        self
    }

    pub fn last_sign_up_attributes(&self) -> Option<SignUpAttributes> {
        self.state.lock().expect("fake lock").last_sign_up_attributes.clone()
    }

    pub fn is_confirmed(&self, identity: &str) -> bool {
        self.state
            .lock()
            .expect("fake lock")
            .accounts
            .get(identity)
            .map(|a| a.confirmed)
            .unwrap_or(false)
    }
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    async fn sign_up(
        &self,
        identity: &str,
        secret: &str,
        attributes: &SignUpAttributes,
    ) -> Result<(), AuthError> {
        let mut s = self.state.lock().expect("fake lock");
        if secret.len() < 8 {
            return Err(AuthError::new("Password did not conform with policy"));
        }
        if s.accounts.contains_key(identity) {
            return Err(AuthError::new("User already exists"));
        }
        s.accounts.insert(
            identity.to_string(),
            Account {
                secret: secret.to_string(),
                confirmed: false,
            },
        );
        s.last_sign_up_attributes = Some(attributes.clone());
        Ok(())
    }

    async fn confirm_sign_up(&self, identity: &str, code: &str) -> Result<(), AuthError> {
        let mut s = self.state.lock().expect("fake lock");
        match s.accounts.get_mut(identity) {
            Some(account) if code == VALID_CODE => {
                account.confirmed = true;
                Ok(())
            }
            Some(_) => Err(AuthError::new("Invalid verification code provided")),
            None => Err(AuthError::new("User does not exist")),
        }
    }

    async fn sign_in(&self, identity: &str, secret: &str) -> Result<SignInOutcome, AuthError> {
        let mut s = self.state.lock().expect("fake lock");
        let verdict = s
            .accounts
            .get(identity)
            .map(|a| (a.secret == secret, a.confirmed));
        match verdict {
            Some((true, true)) => {
                s.signed_in_as = Some(identity.to_string());
                Ok(SignInOutcome { is_signed_in: true })
            }
            Some((true, false)) => Ok(SignInOutcome { is_signed_in: false }),
            _ => Err(AuthError::new("Incorrect username or password")),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut s = self.state.lock().expect("fake lock");
        if s.fail_sign_out {
            return Err(AuthError::new("Network unavailable"));
        }
        s.signed_in_as = None;
        Ok(())
    }

    async fn fetch_session(&self) -> Result<SessionStatus, AuthError> {
        let s = self.state.lock().expect("fake lock");
        if s.fail_session {
            return Err(AuthError::new("Session refresh failed"));
        }
        Ok(SessionStatus {
            is_signed_in: s.signed_in_as.is_some(),
        })
    }

    async fn current_user(&self) -> Result<AuthUser, AuthError> {
        let s = self.state.lock().expect("fake lock");
        s.signed_in_as
            .clone()
            .map(|identity| AuthUser { identity })
            .ok_or_else(|| AuthError::new("No current user"))
    }
}
