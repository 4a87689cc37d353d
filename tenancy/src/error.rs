use vigil_core::{Classified, ErrorKind};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TenancyError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("invalid DSN: {0}")]
    InvalidDsn(String),
    #[error("{0}")]
    Internal(String),
}

impl Classified for TenancyError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidDsn(_) => ErrorKind::Unauthenticated,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
