//! Custom Axum extractors.
//!
//! This module contains custom extractors for common HTTP patterns:
//! - `CorrelationId`: Extract or generate request correlation IDs
//! - `ClientIp`: Extract client IP address from headers or connection
//! - `UserAgent`: Extract User-Agent header
//! - `AuthUser`: Validate the bearer token and load the caller's identity
//!
//! # Examples
//!
//! ```ignore
//! use axum::extract::State;
//! use vigil_web::extractors::{CorrelationId, ClientIp, UserAgent};
//!
//! async fn handler(
//!     State(state): State<AppState>,
//!     correlation_id: CorrelationId,
//!     client_ip: ClientIp,
//!     user_agent: UserAgent,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(
//!         correlation_id = %correlation_id.0,
//!         client_ip = %client_ip.0,
//!         user_agent = %user_agent.0,
//!         "Processing request"
//!     );
//!     Ok(Json(response))
//! }
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::net::IpAddr;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Extracts the correlation ID from the `X-Correlation-ID` header,
/// or generates a new UUID v4 if not present.
///
/// # Example
///
/// ```ignore
/// async fn handler(correlation_id: CorrelationId) -> String {
///     format!("Request ID: {}", correlation_id.0)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Try to extract from X-Correlation-ID header
        let correlation_id = parts
            .headers
            .get("X-Correlation-ID")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Client IP address.
///
/// Extracts the client IP from the `X-Forwarded-For` header (first IP),
/// or falls back to `X-Real-IP`, or the connection IP.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Connection IP (always available)
///
/// # Example
///
/// ```ignore
/// async fn handler(client_ip: ClientIp) -> String {
///     format!("Client IP: {}", client_ip.0)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = extract_client_ip(&parts.headers, parts.extensions.get());

        Ok(Self(ip))
    }
}

/// Extract client IP from headers or connection info.
fn extract_client_ip(
    headers: &HeaderMap,
    _connect_info: Option<&axum::extract::connect_info::ConnectInfo<std::net::SocketAddr>>,
) -> IpAddr {
    // Try X-Forwarded-For (take first IP)
    if let Some(forwarded) = headers.get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    // Try X-Real-IP
    if let Some(real_ip) = headers.get("X-Real-IP") {
        if let Ok(ip_str) = real_ip.to_str() {
            if let Ok(ip) = ip_str.parse::<IpAddr>() {
                return ip;
            }
        }
    }

    // Fallback to localhost (connection IP would come from ConnectInfo middleware)
    "127.0.0.1".parse().expect("Valid IP")
}

/// User-Agent header.
///
/// Extracts the `User-Agent` header, or returns "Unknown" if not present.
///
/// # Example
///
/// ```ignore
/// async fn handler(user_agent: UserAgent) -> String {
///     format!("User-Agent: {}", user_agent.0)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct UserAgent(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("Unknown")
            .to_string();

        Ok(Self(user_agent))
    }
}

/// The authenticated caller of a management-API request, resolved from the
/// `Authorization: Bearer <access token>` header (§6.2). Unlike
/// [`CorrelationId`]/[`ClientIp`]/[`UserAgent`] this needs concrete access
/// to the signing keys and token policy, so it extracts from [`AppState`]
/// rather than any `S: Send + Sync`.
///
/// # Example
///
/// ```ignore
/// async fn handler(auth: AuthUser, State(state): State<AppState>) -> WebResult<Json<Response>> {
///     tracing::info!(user_id = %auth.user_id, "authenticated request");
///     Ok(Json(response))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
}

#[axum::async_trait]
impl FromRequestParts<crate::state::AppState> for AuthUser {
    type Rejection = crate::error::AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &crate::state::AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| crate::error::AppError::unauthorized("missing bearer token"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| crate::error::AppError::unauthorized("authorization header must be a bearer token"))?;

        let claims = vigil_auth::token::validate(
            token,
            vigil_auth::token::TokenType::Access,
            &state.token_policy.issuer,
            &state.keys,
        )
        .map_err(crate::error::AppError::from)?;

        Ok(Self { user_id: claims.sub })
    }
}
