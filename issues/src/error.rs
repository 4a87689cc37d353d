//! Failure taxonomy for issue listing, lifecycle, and annotation (§4.7).

use vigil_core::{Classified, ErrorKind};

#[derive(Debug, Clone, thiserror::Error)]
pub enum IssueError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("cannot transition issue from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Internal(String),
}

impl Classified for IssueError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
