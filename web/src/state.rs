//! Application state shared across every Axum handler: the four repository
//! ports (C4/C5/C7/C3), the clock, the signing keypair, token policy, and
//! the DSN host used to build project DSNs on project creation.

use std::sync::Arc;

use vigil_auth::{Keypair, TokenPolicy, UserRepository};
use vigil_core::Clock;
use vigil_ingest::IngestRepository;
use vigil_issues::IssueRepository;
use vigil_tenancy::TenancyRepository;

#[derive(Clone)]
pub struct AppState {
    pub tenancy: Arc<dyn TenancyRepository>,
    pub users: Arc<dyn UserRepository>,
    pub issues: Arc<dyn IssueRepository>,
    pub ingest: Arc<dyn IngestRepository>,
    pub clock: Arc<dyn Clock>,
    pub keys: Arc<Keypair>,
    pub token_policy: Arc<TokenPolicy>,
    pub dsn_host: Arc<str>,
}

impl AppState {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenancy: Arc<dyn TenancyRepository>,
        users: Arc<dyn UserRepository>,
        issues: Arc<dyn IssueRepository>,
        ingest: Arc<dyn IngestRepository>,
        clock: Arc<dyn Clock>,
        keys: Arc<Keypair>,
        token_policy: Arc<TokenPolicy>,
        dsn_host: Arc<str>,
    ) -> Self {
        Self { tenancy, users, issues, ingest, clock, keys, token_policy, dsn_host }
    }
}
