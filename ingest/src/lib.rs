//! # Vigil Ingest
//!
//! The event ingestion pipeline (C3): resolve the submitting project from
//! its credential, normalize the envelope, compute its fingerprint, and
//! upsert the matching issue together with the new event as one atomic
//! unit, with idempotency on duplicate `(projectId, eventId)` submission.

#![forbid(unsafe_code)]

pub mod credential;
pub mod error;
pub mod model;
pub mod repository;
pub mod service;

pub use credential::Credential;
pub use error::IngestError;
pub use model::{EventRecord, IngestOutcome};
pub use repository::IngestRepository;
pub use service::ingest;
