use thiserror::Error;

/// The nine error kinds the core can produce. Dispatch/HTTP adapters are the
/// sole translators from a kind to a user-visible response; nothing in this
/// crate formats a message for an end user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("user is not registered")]
    NotRegistered,

    #[error("user is already registered")]
    AlreadyRegistered,

    #[error("mnemonic is invalid, expired, or already consumed")]
    InvalidMnemonic,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not authorized to access this resource")]
    NotAuthorized,

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    #[must_use]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
