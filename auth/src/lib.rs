//! # Vigil Auth
//!
//! Credential verification and EdDSA-signed access/refresh token issuance
//! (C5). Owns the `User` entity; every other crate that needs to refer to a
//! user holds only its `Uuid`.

#![forbid(unsafe_code)]

pub mod error;
pub mod keys;
pub mod model;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

pub use error::AuthError;
pub use keys::Keypair;
pub use model::UserRecord;
pub use repository::UserRepository;
pub use token::{Claims, TokenPair, TokenPolicy, TokenType};
