use crate::api::ApiError;
use crate::auth::AuthError;

/// Failure of a session or note operation.
///
/// This is the value stored in the session's "current error" slot, so it is
/// cheap to clone and always renders a human-readable message.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Request failed: {0}")]
    Network(#[from] ApiError),

    /// A local precondition failed; nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
