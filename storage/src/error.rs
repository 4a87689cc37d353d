//! Classification of `sqlx` failures into each domain crate's own error
//! taxonomy, plus the storage-layer errors that arise before a domain error
//! can even be constructed (pool exhaustion, a failed migration run).

#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("failed to connect to postgres: {0}")]
    Connection(String),
    #[error("failed to apply migrations: {0}")]
    Migration(String),
}

/// The outcome a raw `sqlx::Error` is sorted into before being mapped onto a
/// domain crate's own error type at the call site.
pub enum SqlFailure {
    /// A `UNIQUE` constraint was violated — the caller typically turns this
    /// into a domain `Conflict`.
    UniqueViolation,
    /// No matching constraint violation; an infrastructure failure the
    /// caller maps onto its domain's `Internal` variant.
    Other(String),
}

/// Inspect a `sqlx::Error`, classifying Postgres unique-constraint
/// violations (SQLSTATE `23505`) separately from every other failure so
/// callers can turn "this row already exists" into a domain `Conflict`
/// instead of an opaque `Internal`.
#[must_use]
pub fn classify(err: &sqlx::Error) -> SqlFailure {
    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return SqlFailure::UniqueViolation;
        }
    }
    SqlFailure::Other(err.to_string())
}
