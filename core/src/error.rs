//! Shared error taxonomy.
//!
//! Every domain crate (`tenancy`, `auth`, `issues`, `ingest`) defines its own
//! `thiserror` enum for the failures it can produce, then implements
//! [`Classified`] so the web layer can map any of them onto an HTTP status
//! and machine-readable code without each crate knowing about HTTP.

use std::fmt;

/// The error-class buckets from which every HTTP response status is derived.
///
/// Mirrors the taxonomy in the spec: validation, auth, access, lookup,
/// conflict, state-machine, idempotent-success, and infrastructure failures
/// are all distinct because callers react to them differently (retry,
/// surface to user, log and alert).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: bad JSON, missing field, invalid enum/slug/uuid.
    Validation,
    /// Missing, expired, or wrong-type credential.
    Unauthenticated,
    /// Authenticated but not permitted to perform this operation.
    Forbidden,
    /// Referenced entity does not exist.
    NotFound,
    /// Uniqueness violation (email, slug, membership).
    Conflict,
    /// Disallowed issue-status transition.
    InvalidTransition,
    /// Duplicate ingestion — treated as success, not failure.
    AlreadyIngested,
    /// Pool exhaustion or connectivity blip; caller may retry.
    Transient,
    /// The caller's cancellation signal fired before completion.
    Canceled,
    /// Unclassified failure.
    Internal,
}

impl ErrorKind {
    /// Machine-readable code surfaced in the `{"error": ...}` response body.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::AlreadyIngested => "ALREADY_INGESTED",
            Self::Transient => "TRANSIENT",
            Self::Canceled => "CANCELED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Implemented by every domain error enum so the web layer can classify it
/// without a dependency on each crate's concrete error type.
pub trait Classified: std::error::Error {
    /// Which bucket this error falls into.
    fn kind(&self) -> ErrorKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(ErrorKind::Validation.code(), "VALIDATION_ERROR");
        assert_eq!(ErrorKind::AlreadyIngested.code(), "ALREADY_INGESTED");
        assert_eq!(ErrorKind::Internal.code(), "INTERNAL");
    }
}
