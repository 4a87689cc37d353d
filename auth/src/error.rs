//! Failure taxonomy for credential verification and token issuance (§4.5).

use vigil_core::{Classified, ErrorKind};

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is inactive")]
    InactiveAccount,
    #[error("token has expired")]
    TokenExpired,
    #[error("token is invalid")]
    TokenInvalid,
    #[error("token is not valid for this operation")]
    TokenWrongType,
    #[error("an account with this email already exists")]
    EmailExists,
    #[error("password does not meet strength requirements")]
    WeakPassword,
    #[error("{0}")]
    Internal(String),
}

impl Classified for AuthError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials | Self::TokenExpired | Self::TokenInvalid | Self::TokenWrongType => {
                ErrorKind::Unauthenticated
            }
            Self::InactiveAccount => ErrorKind::Forbidden,
            Self::EmailExists => ErrorKind::Conflict,
            Self::WeakPassword => ErrorKind::Validation,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
