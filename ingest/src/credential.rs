//! Project-scope credential extraction (§6.1). Transport concerns (reading
//! headers/query params off the actual request) live in the `web` crate;
//! this module only knows how to parse the three accepted forms once
//! they've been handed over as plain strings.

use crate::error::IngestError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Parsed from `X-Sentry-Auth: Sentry sentry_key=<publicKey>, ...`.
    SentryAuthKey(String),
    /// `Authorization: Bearer <token>`, token is a full DSN or a bare public key.
    Bearer(String),
    /// `?dsn=<full DSN>`.
    DsnQuery(String),
    /// `?sentry_key=<publicKey>`.
    SentryKeyQuery(String),
}

impl Credential {
    /// The string to hand to `vigil_tenancy::service::resolve_project_by_credential`.
    #[must_use]
    pub fn as_resolvable(&self) -> &str {
        match self {
            Self::SentryAuthKey(v) | Self::Bearer(v) | Self::DsnQuery(v) | Self::SentryKeyQuery(v) => v,
        }
    }
}

/// Parse `Sentry sentry_key=<publicKey>, sentry_version=7, sentry_client=...`.
#[must_use]
pub fn parse_sentry_auth_header(value: &str) -> Option<Credential> {
    let rest = value.strip_prefix("Sentry ")?;
    for pair in rest.split(',') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == "sentry_key" && !val.is_empty() {
            return Some(Credential::SentryAuthKey(val.to_string()));
        }
    }
    None
}

#[must_use]
pub fn parse_bearer_header(value: &str) -> Option<Credential> {
    value.strip_prefix("Bearer ").map(|t| Credential::Bearer(t.trim().to_string()))
}

/// Resolve a credential from the sources the transport layer extracted,
/// tried in the priority order §6.1 specifies.
pub fn resolve(
    sentry_auth_header: Option<&str>,
    authorization_header: Option<&str>,
    dsn_query: Option<&str>,
    sentry_key_query: Option<&str>,
) -> Result<Credential, IngestError> {
    if let Some(c) = sentry_auth_header.and_then(parse_sentry_auth_header) {
        return Ok(c);
    }
    if let Some(c) = authorization_header.and_then(parse_bearer_header) {
        return Ok(c);
    }
    if let Some(dsn) = dsn_query.filter(|s| !s.is_empty()) {
        return Ok(Credential::DsnQuery(dsn.to_string()));
    }
    if let Some(key) = sentry_key_query.filter(|s| !s.is_empty()) {
        return Ok(Credential::SentryKeyQuery(key.to_string()));
    }
    Err(IngestError::Unauthenticated("no ingestion credential supplied".to_string()))
}
