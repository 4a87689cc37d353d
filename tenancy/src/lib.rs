//! # Vigil Tenancy
//!
//! Organizations, members, projects, DSN/key lifecycle, slug rules, and the
//! authorization resolver (C4 + C6): the single place that answers "does
//! user U have access to project P" and "does this DSN identify an active
//! project".

#![forbid(unsafe_code)]

pub mod authz;
pub mod dsn;
pub mod error;
pub mod model;
pub mod repository;
pub mod service;
pub mod slug;

pub use authz::{authorize, Permission};
pub use error::TenancyError;
pub use model::{Organization, OrganizationMember, Platform, Project, Role};
pub use repository::TenancyRepository;
