//! Failure taxonomy for the ingestion pipeline (§4.3, §7).
//!
//! `AlreadyIngested` is deliberately not a variant here: a duplicate
//! `(projectId, eventId)` submission is a successful outcome (the caller
//! gets the original ids back), not a failure, so it's represented as a
//! flag on [`crate::model::IngestOutcome`] instead.

use vigil_core::{Classified, ErrorKind};
use vigil_normalize::NormalizeError;
use vigil_tenancy::TenancyError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Transient(String),
    #[error("{0}")]
    Internal(String),
}

impl Classified for IngestError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<NormalizeError> for IngestError {
    fn from(err: NormalizeError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<TenancyError> for IngestError {
    fn from(err: TenancyError) -> Self {
        match err.kind() {
            ErrorKind::Forbidden => Self::Forbidden(err.to_string()),
            ErrorKind::Unauthenticated | ErrorKind::NotFound => Self::Unauthenticated(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}
