//! Validation failures raised while reducing a raw envelope (§4.2).

use vigil_core::{Classified, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("event has neither a message nor an exception")]
    MissingContent,
    #[error("exception.values is present but empty")]
    EmptyExceptionValues,
    #[error("invalid level {0:?}; expected one of debug, info, warning, error, fatal")]
    InvalidLevel(String),
}

impl Classified for NormalizeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
