//! # Vigil Storage
//!
//! PostgreSQL-backed implementations of every domain crate's repository
//! port (C8): connection pooling, migrations, and the Postgres adapters for
//! tenancy, auth, issues, and ingestion. Every other crate in the workspace
//! depends only on its own repository trait; this is the one crate that
//! depends on `sqlx` directly.

#![forbid(unsafe_code)]

pub mod auth;
pub mod error;
pub mod ingest;
pub mod issues;
pub mod pool;
pub mod tenancy;

pub use auth::PgUserRepository;
pub use error::StorageError;
pub use ingest::PgIngestRepository;
pub use issues::PgIssueRepository;
pub use pool::connect;
pub use tenancy::PgTenancyRepository;
