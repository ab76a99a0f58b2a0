//! Errors surfaced by the authentication workflow.
//!
//! Internal detail (which step failed, why a token was rejected) lives in the
//! variants and in the logs; [`AuthError::public_message`] is what a caller
//! is allowed to see.

use thiserror::Error;

use super::jwt::TokenError;
use super::password::HashError;
use super::repo::StoreError;

const AUTH_FAILED: &str = "Invalid credentials";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an account with this email already exists")]
    DuplicateUser,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account vanished after its identity was established")]
    UserNotFound,
    #[error("invalid or expired token")]
    InvalidToken(#[source] TokenError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} did not answer before the deadline")]
    Timeout(&'static str),
    #[error(transparent)]
    Hashing(#[from] HashError),
    #[error("background task failed: {0}")]
    Task(String),
    #[error(transparent)]
    Store(StoreError),
    #[error("token issuance failed: {0}")]
    Token(#[source] TokenError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            // The store is the final arbiter of email uniqueness.
            StoreError::ConstraintViolation(_) => AuthError::DuplicateUser,
            other => AuthError::Store(other),
        }
    }
}

impl AuthError {
    /// Credential or identity failures, as opposed to infrastructure faults.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials | AuthError::UserNotFound | AuthError::InvalidToken(_)
        )
    }

    /// Message safe to hand to an external caller.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::DuplicateUser => "Email already registered".into(),
            AuthError::InvalidCredentials | AuthError::UserNotFound => AUTH_FAILED.into(),
            AuthError::InvalidToken(_) => "Invalid or expired token".into(),
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Timeout(_) => "Service temporarily unavailable".into(),
            AuthError::Hashing(_)
            | AuthError::Task(_)
            | AuthError::Store(_)
            | AuthError::Token(_) => "Internal error".into(),
        }
    }
}
