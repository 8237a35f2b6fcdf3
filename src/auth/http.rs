use super::{AuthError, AuthProvider, AuthUser, SessionStatus, SignInOutcome, SignUpAttributes};
use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::storage::{PreferenceStore, TOKEN_KEY};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignUpRequest<'a> {
    pub identity: &'a str,
    pub secret: &'a str,
    pub attributes: &'a SignUpAttributes,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfirmSignUpRequest<'a> {
    pub identity: &'a str,
    pub code: &'a str,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInRequest<'a> {
    pub identity: &'a str,
    pub secret: &'a str,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInResponse {
    #[serde(default)]
    pub token: Option<String>,
    /// Absent on older servers; a returned token then means signed in.
    #[serde(default)]
    pub is_signed_in: Option<bool>,
}

impl SignInResponse {
    fn outcome(&self) -> SignInOutcome {
        SignInOutcome {
            is_signed_in: self.is_signed_in.unwrap_or(self.token.is_some()),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        AuthError::new(e.message)
    }
}

/// Identity provider reached over the same HTTP origin as the notes API.
///
/// Shares its [`AccessToken`](crate::api::AccessToken) with the notes client,
/// so a successful sign-in authorizes note requests immediately.
#[derive(Clone)]
pub struct HttpAuthProvider {
    client: ApiClient,
    prefs: Option<Arc<dyn PreferenceStore>>,
}

impl HttpAuthProvider {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            prefs: None,
        }
    }

    /// Persist the access token in `prefs`, restoring one saved by an
    /// earlier run.
    pub fn with_token_store(mut self, prefs: Arc<dyn PreferenceStore>) -> Self {
        if let Some(token) = prefs.get_item(TOKEN_KEY).filter(|t| !t.is_empty()) {
            tracing::debug!("Restored persisted access token");
            self.client.set_token(token);
        }
        self.prefs = Some(prefs);
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn save_token(&self, token: &str) {
        self.client.set_token(token);
        if let Some(prefs) = &self.prefs {
            if let Err(e) = prefs.set_item(TOKEN_KEY, token) {
                tracing::warn!(error = %e, "Failed to persist access token");
            }
        }
    }

    fn forget_token(&self) {
        self.client.token().clear();
        if let Some(prefs) = &self.prefs {
            if let Err(e) = prefs.remove_item(TOKEN_KEY) {
                tracing::warn!(error = %e, "Failed to remove persisted access token");
            }
        }
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn sign_up(
        &self,
        identity: &str,
        secret: &str,
        attributes: &SignUpAttributes,
    ) -> Result<(), AuthError> {
        let body = SignUpRequest {
            identity,
            secret,
            attributes,
        };
        self.client
            .send_json(Method::POST, "/auth/sign-up", &body, "Sign up")
            .await?;
        Ok(())
    }

    async fn confirm_sign_up(&self, identity: &str, code: &str) -> Result<(), AuthError> {
        let body = ConfirmSignUpRequest { identity, code };
        self.client
            .send_json(Method::POST, "/auth/confirm-sign-up", &body, "Confirm sign-up")
            .await?;
        Ok(())
    }

    async fn sign_in(&self, identity: &str, secret: &str) -> Result<SignInOutcome, AuthError> {
        let body = SignInRequest { identity, secret };
        let res: SignInResponse = self
            .client
            .fetch_json(Method::POST, "/auth/sign-in", Some(&body), "Sign in")
            .await
            .map_err(|e| match e.kind {
                ApiErrorKind::Unauthorized => AuthError::new("Incorrect username or password"),
                _ => AuthError::from(e),
            })?;

        let outcome = res.outcome();
        match res.token.as_deref() {
            Some(token) if outcome.is_signed_in => self.save_token(token),
            _ => self.forget_token(),
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if !self.client.is_authenticated() {
            self.forget_token();
            return Ok(());
        }

        let result = self
            .client
            .send_json(Method::POST, "/auth/sign-out", &(), "Sign out")
            .await;
        self.forget_token();
        result.map_err(AuthError::from)
    }

    async fn fetch_session(&self) -> Result<SessionStatus, AuthError> {
        if !self.client.is_authenticated() {
            return Ok(SessionStatus {
                is_signed_in: false,
            });
        }

        match self
            .client
            .fetch_json::<SessionStatus, ()>(Method::GET, "/auth/session", None, "Fetch session")
            .await
        {
            Ok(status) => {
                if !status.is_signed_in {
                    self.forget_token();
                }
                Ok(status)
            }
            Err(e) if e.kind == ApiErrorKind::Unauthorized => {
                self.forget_token();
                Ok(SessionStatus {
                    is_signed_in: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn current_user(&self) -> Result<AuthUser, AuthError> {
        let user = self
            .client
            .fetch_json::<AuthUser, ()>(Method::GET, "/auth/me", None, "Current user")
            .await?;
        Ok(user)
    }
}
