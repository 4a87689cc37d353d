//! `/api/{projectId}/store/`, `/api/v1/errors/ingest` — the unauthenticated
//! ingestion surface (§6.1, C3). Credential resolution happens here because
//! only the transport layer sees headers and query parameters; everything
//! past that is `vigil_ingest::service::ingest`.

use axum::{
    extract::{ConnectInfo, Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::net::SocketAddr;
use uuid::Uuid;

use vigil_ingest::{credential, service, Credential};
use vigil_normalize::RawEnvelope;

use crate::dto::IngestResponse;
use crate::state::AppState;
use crate::WebResult;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then_some(v)
    })
}

fn resolve_credential(headers: &HeaderMap, query: Option<&str>) -> Result<Credential, vigil_ingest::IngestError> {
    let sentry_auth = header_str(headers, "x-sentry-auth");
    let authorization = header_str(headers, "authorization");
    let dsn = query.and_then(|q| query_param(q, "dsn"));
    let sentry_key = query.and_then(|q| query_param(q, "sentry_key"));
    credential::resolve(sentry_auth, authorization, dsn, sentry_key)
}

async fn run_ingest(
    state: AppState,
    headers: HeaderMap,
    query: Option<String>,
    addr: Option<SocketAddr>,
    envelope: RawEnvelope,
) -> WebResult<(StatusCode, Json<IngestResponse>)> {
    let credential = resolve_credential(&headers, query.as_deref())?;
    let user_agent = header_str(&headers, "user-agent").map(str::to_string);
    let client_ip = addr.map(|a| a.ip().to_string());

    let outcome = service::ingest(
        state.tenancy.as_ref(),
        state.ingest.as_ref(),
        state.clock.as_ref(),
        &credential,
        envelope,
        client_ip,
        user_agent,
    )
    .await?;

    let status = if outcome.already_ingested { StatusCode::OK } else { StatusCode::CREATED };
    Ok((
        status,
        Json(IngestResponse {
            id: outcome.internal_id,
            event_id: outcome.event_id,
            project_id: outcome.project_id,
            issue_id: outcome.issue_id,
            created_at: outcome.created_at,
        }),
    ))
}

/// `POST /api/{projectId}/store/` — the classic Sentry store endpoint.
/// `project_id` in the path is informational only (§6.1): the credential
/// alone decides which project owns the event, matching how a real DSN
/// embeds the key rather than relying on the URL.
pub async fn store(
    State(state): State<AppState>,
    Path(_project_id): Path<Uuid>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(envelope): Json<RawEnvelope>,
) -> WebResult<(StatusCode, Json<IngestResponse>)> {
    run_ingest(state, headers, query, Some(addr), envelope).await
}

/// `POST /api/v1/errors/ingest` — the alternate, DSN-free ingestion path
/// (§6.1) that resolves the project purely from the `Authorization` or
/// query-string credential.
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(envelope): Json<RawEnvelope>,
) -> WebResult<(StatusCode, Json<IngestResponse>)> {
    run_ingest(state, headers, query, Some(addr), envelope).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_extracts_value() {
        assert_eq!(query_param("dsn=abc&sentry_key=def", "dsn"), Some("abc"));
        assert_eq!(query_param("dsn=abc&sentry_key=def", "sentry_key"), Some("def"));
        assert_eq!(query_param("dsn=abc", "missing"), None);
    }

    #[test]
    fn resolve_credential_prefers_sentry_auth_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-sentry-auth", "Sentry sentry_key=abc123".parse().expect("header value"));
        let credential = resolve_credential(&headers, Some("dsn=ignored")).expect("resolve");
        assert_eq!(credential, Credential::SentryAuthKey("abc123".to_string()));
    }

    #[test]
    fn resolve_credential_falls_back_to_query_string() {
        let headers = HeaderMap::new();
        let credential = resolve_credential(&headers, Some("sentry_key=bare-key")).expect("resolve");
        assert_eq!(credential, Credential::SentryKeyQuery("bare-key".to_string()));
    }
}
