//! # Vigil Core
//!
//! Shared types that every other crate in the workspace depends on:
//! the process [`config::Config`], the [`error::ErrorKind`] taxonomy every
//! domain error classifies itself into, and the [`environment::Clock`]
//! abstraction used anywhere the system reads the wall clock.
//!
//! Identifiers (organization, project, user, issue, event ids) are plain
//! [`uuid::Uuid`] values throughout the workspace rather than per-entity
//! newtypes — the entities are too numerous and too often passed around in
//! bulk (bulk-update issue ids, filter sets) for the newtype boilerplate to
//! pay for itself here.

#![forbid(unsafe_code)]

pub mod config;
pub mod environment;
pub mod error;

pub use config::Config;
pub use environment::{Clock, FixedClock, SystemClock};
pub use error::{Classified, ErrorKind};
