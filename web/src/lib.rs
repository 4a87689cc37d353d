//! The Axum HTTP transport (§6, §10.1): the ingestion surface and the
//! management API behind one [`axum::Router`].
//!
//! # Request flow
//!
//! 1. The correlation-id middleware tags the request and opens a tracing span.
//! 2. Extractors ([`extractors::AuthUser`] on protected routes, the ingestion
//!    handlers' own credential resolution) pull identity out of headers.
//! 3. The handler calls straight into a domain crate's `service` module —
//!    `web` holds no business logic of its own, only request/response shapes.
//! 4. [`error::AppError`] converts every domain error into the right HTTP
//!    status and machine-readable code via `From`.
//!
//! ```ignore
//! use std::time::Duration;
//! use vigil_web::{routes::build_router, AppState};
//!
//! let app = build_router(state, Duration::from_secs(30));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use extractors::{AuthUser, ClientIp, CorrelationId, UserAgent};
pub use middleware::{correlation_id_layer, CorrelationIdExt, CORRELATION_ID_HEADER};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
