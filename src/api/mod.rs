use crate::models::{Note, NoteInput};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn network(e: reqwest::Error) -> Self {
        Self::new(ApiErrorKind::Network, e.to_string())
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorKind::Parse, e.to_string())
    }

    fn unauthorized() -> Self {
        Self::new(ApiErrorKind::Unauthorized, "Unauthorized")
    }

    fn http(status: StatusCode, body: String, ctx: &str) -> Self {
        Self::new(ApiErrorKind::Http, format!("{ctx} ({status}): {body}"))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub const API_URL_ENV: &str = "TYPENOTE_API_URL";
pub const LEGACY_API_URL_ENV: &str = "API_URL";
pub const API_TIMEOUT_ENV: &str = "TYPENOTE_API_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:6689";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    pub api_url: String,
    pub request_timeout: Duration,
}

impl EnvConfig {
    pub fn new() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        // `TYPENOTE_API_URL` wins; bare `API_URL` is still honored.
        let api_url = [API_URL_ENV, LEGACY_API_URL_ENV]
            .iter()
            .filter_map(|key| lookup(key))
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = lookup(API_TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_url,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Bearer token shared between the identity adapter (writer) and the notes
/// client (reader).
#[derive(Clone, Debug, Default)]
pub struct AccessToken(Arc<RwLock<Option<String>>>);

impl AccessToken {
    pub fn get(&self) -> Option<String> {
        self.0.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_set(&self) -> bool {
        self.0.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub category_id: String,
    /// Omitted entirely for the default color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

impl From<NoteInput> for CreateNoteRequest {
    fn from(input: NoteInput) -> Self {
        Self {
            title: input.title,
            content: input.content,
            category_id: input.category_id,
            color_id: input.color_id,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub note_id: String,
    pub title: String,
    pub content: String,
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

impl UpdateNoteRequest {
    pub fn new(note_id: impl Into<String>, input: NoteInput) -> Self {
        Self {
            note_id: note_id.into(),
            title: input.title,
            content: input.content,
            category_id: input.category_id,
            color_id: input.color_id,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NotesEnvelope {
    pub notes: Vec<Note>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The two accepted bodies of `GET /notes`.
#[derive(Clone, Debug)]
pub enum NoteListPayload {
    /// `{ "notes": [...], "message": ... }`
    Envelope(NotesEnvelope),
    /// `[...]`
    Bare(Vec<Note>),
}

impl NoteListPayload {
    /// Envelope first, bare array second. Anything else is a parse error.
    pub fn decode(body: &[u8]) -> ApiResult<Self> {
        let envelope_err = match serde_json::from_slice::<NotesEnvelope>(body) {
            Ok(envelope) => return Ok(Self::Envelope(envelope)),
            Err(e) => e,
        };

        match serde_json::from_slice::<Vec<Note>>(body) {
            Ok(notes) => {
                tracing::debug!(count = notes.len(), "Note list decoded from bare array");
                Ok(Self::Bare(notes))
            }
            Err(bare_err) => Err(ApiError::parse(format!(
                "note list is neither an envelope ({envelope_err}) nor an array ({bare_err})"
            ))),
        }
    }

    pub fn into_notes(self) -> Vec<Note> {
        match self {
            Self::Envelope(envelope) => envelope.notes,
            Self::Bare(notes) => notes,
        }
    }
}

/// Remote note store, scoped to the authenticated caller.
#[async_trait]
pub trait NotesApi: Send + Sync {
    async fn list_notes(&self) -> ApiResult<Vec<Note>>;
    async fn create_note(&self, req: &CreateNoteRequest) -> ApiResult<()>;
    async fn update_note(&self, req: &UpdateNoteRequest) -> ApiResult<()>;
    async fn delete_note(&self, note_id: &str) -> ApiResult<()>;
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: AccessToken,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::with_timeout(config.api_url.clone(), config.request_timeout)
    }

    fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: AccessToken::default(),
            http,
        }
    }

    /// Share a token handle with another component (typically the identity
    /// adapter).
    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.token.set(token);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_set()
    }

    fn get_auth_header(&self) -> Option<String> {
        self.token.get().map(|t| format!("Bearer {}", t))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn note_path(note_id: &str) -> String {
        format!("/notes/{}", urlencoding::encode(note_id))
    }

    async fn send(&self, req: reqwest::RequestBuilder, ctx: &str) -> ApiResult<reqwest::Response> {
        let req = match self.get_auth_header() {
            Some(header) => req.header("Authorization", header),
            None => req,
        };

        let res = req.send().await.map_err(ApiError::network)?;
        let status = res.status();

        if status.is_success() {
            Ok(res)
        } else if status == StatusCode::UNAUTHORIZED {
            Err(ApiError::unauthorized())
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, ctx))
        }
    }

    /// JSON request; the response body is discarded.
    pub(crate) async fn send_json<B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        ctx: &str,
    ) -> ApiResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        let req = self.http.request(method, self.url(path)).json(body);
        self.send(req, ctx).await.map(|_| ())
    }

    pub(crate) async fn fetch_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        ctx: &str,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let mut req = self.http.request(method, self.url(path));
        if let Some(b) = body {
            req = req.json(b);
        }
        let res = self.send(req, ctx).await?;
        res.json().await.map_err(ApiError::parse)
    }
}

#[async_trait]
impl NotesApi for ApiClient {
    async fn list_notes(&self) -> ApiResult<Vec<Note>> {
        let req = self.http.get(self.url("/notes"));
        let res = self.send(req, "List notes").await?;
        let body = res.bytes().await.map_err(ApiError::network)?;
        Ok(NoteListPayload::decode(&body)?.into_notes())
    }

    async fn create_note(&self, req: &CreateNoteRequest) -> ApiResult<()> {
        self.send_json(Method::POST, "/notes", req, "Create note").await
    }

    async fn update_note(&self, req: &UpdateNoteRequest) -> ApiResult<()> {
        self.send_json(Method::PUT, &Self::note_path(&req.note_id), req, "Update note")
            .await
    }

    async fn delete_note(&self, note_id: &str) -> ApiResult<()> {
        let req = self.http.delete(self.url(&Self::note_path(note_id)));
        self.send(req, "Delete note").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_note_list_envelope_contract_deserialize() {
        let json = r#"{
            "notes": [
                {"userId": "u", "noteId": "n1", "title": "a", "content": "", "categoryId": "work",
                 "createdAt": "2025-06-21T10:00:00Z", "updatedAt": "2025-06-21T10:00:00Z"}
            ],
            "message": "ok"
        }"#;
        let payload = NoteListPayload::decode(json.as_bytes()).expect("envelope should parse");
        assert!(matches!(payload, NoteListPayload::Envelope(_)));
        let notes = payload.into_notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note_id, "n1");
    }

    #[test]
    fn test_note_list_envelope_without_message() {
        let payload = NoteListPayload::decode(br#"{"notes": []}"#).expect("should parse");
        assert!(matches!(payload, NoteListPayload::Envelope(ref e) if e.message.is_none()));
    }

    #[test]
    fn test_note_list_bare_array_fallback() {
        let json = r#"[
            {"userId": "u", "noteId": "n1", "title": "a", "content": "", "categoryId": "work",
             "createdAt": "2025-06-21T10:00:00Z", "updatedAt": "2025-06-21T10:00:00Z"},
            {"userId": "u", "noteId": "n2", "title": "b", "content": "", "categoryId": "ideas",
             "colorId": "red", "createdAt": "2025-06-22T10:00:00Z", "updatedAt": "2025-06-22T10:00:00Z"}
        ]"#;
        let payload = NoteListPayload::decode(json.as_bytes()).expect("bare array should parse");
        assert!(matches!(payload, NoteListPayload::Bare(_)));
        assert_eq!(payload.into_notes().len(), 2);
    }

    #[test]
    fn test_note_list_malformed_is_parse_error() {
        let err = NoteListPayload::decode(br#"{"items": 3}"#).expect_err("should fail");
        assert_eq!(err.kind, ApiErrorKind::Parse);
        let err = NoteListPayload::decode(b"<html>").expect_err("should fail");
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }

    #[test]
    fn test_create_request_omits_absent_color() {
        let req = CreateNoteRequest::from(
            NoteInput::new("Groceries", "milk")
                .category("personal")
                .normalized()
                .expect("valid"),
        );
        let v = serde_json::to_value(&req).expect("should serialize");
        assert_eq!(v["title"], "Groceries");
        assert_eq!(v["categoryId"], "personal");
        assert!(v.get("colorId").is_none());
    }

    #[test]
    fn test_update_request_serialization_includes_note_id_and_color() {
        let req = UpdateNoteRequest::new(
            "note-1",
            NoteInput::new("t", "c").color(Some("blue")),
        );
        let v = serde_json::to_value(&req).expect("should serialize");
        assert_eq!(v["noteId"], "note-1");
        assert_eq!(v["colorId"], "blue");
        assert_eq!(v["categoryId"], "default");
    }

    #[test]
    fn test_note_path_is_percent_encoded() {
        assert_eq!(ApiClient::note_path("note-1"), "/notes/note-1");
        assert_eq!(ApiClient::note_path("a/b c"), "/notes/a%2Fb%20c");
    }

    #[test]
    fn test_api_client_new_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:6689/");
        assert_eq!(client.base_url, "http://localhost:6689");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_api_client_get_auth_header_with_shared_token() {
        let token = AccessToken::default();
        let client = ApiClient::new("http://localhost:6689").with_token(token.clone());
        assert!(client.get_auth_header().is_none());

        token.set("my-jwt-token");
        assert!(client.is_authenticated());
        assert_eq!(client.get_auth_header().as_deref(), Some("Bearer my-jwt-token"));

        token.clear();
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_env_config_defaults() {
        let cfg = EnvConfig::from_lookup(|_| None);
        assert_eq!(cfg.api_url, "http://localhost:6689");
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_env_config_prefers_primary_variable() {
        let env: HashMap<&str, &str> = [
            (API_URL_ENV, "https://notes.example.com/api/"),
            (LEGACY_API_URL_ENV, "http://legacy"),
            (API_TIMEOUT_ENV, "5"),
        ]
        .into_iter()
        .collect();
        let cfg = EnvConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.api_url, "https://notes.example.com/api");
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_env_config_legacy_variable_and_bad_timeout() {
        let cfg = EnvConfig::from_lookup(|k| match k {
            LEGACY_API_URL_ENV => Some("http://legacy".to_string()),
            API_TIMEOUT_ENV => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(cfg.api_url, "http://legacy");
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }
}
