//! Access/refresh token issuance and validation (§4.5).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::keys::Keypair;
use crate::model::UserRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub jti: Uuid,
    pub token_type: TokenType,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Issuer and lifetime policy. Built from `AuthConfig`.
pub struct TokenPolicy {
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

pub fn issue_pair(
    user: &UserRecord,
    now: DateTime<Utc>,
    policy: &TokenPolicy,
    keys: &Keypair,
) -> Result<TokenPair, AuthError> {
    let access_expires_at = now + policy.access_ttl;
    let refresh_expires_at = now + policy.refresh_ttl;
    let access_token = encode_claims(user, now, access_expires_at, TokenType::Access, &policy.issuer, keys)?;
    let refresh_token = encode_claims(user, now, refresh_expires_at, TokenType::Refresh, &policy.issuer, keys)?;
    Ok(TokenPair {
        access_token,
        refresh_token,
        access_expires_at,
        refresh_expires_at,
    })
}

fn encode_claims(
    user: &UserRecord,
    now: DateTime<Utc>,
    exp: DateTime<Utc>,
    token_type: TokenType,
    issuer: &str,
    keys: &Keypair,
) -> Result<String, AuthError> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        name: user.display_name.clone(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        iss: issuer.to_string(),
        jti: Uuid::new_v4(),
        token_type,
    };
    encode(&Header::new(Algorithm::EdDSA), &claims, &keys.encoding_key)
        .map_err(|e| AuthError::Internal(format!("failed to sign token: {e}")))
}

/// Validate a token's signature, expiry, issuer, and declared type.
pub fn validate(token: &str, expected_type: TokenType, issuer: &str, keys: &Keypair) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[issuer]);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &keys.decoding_key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })?;

    if data.claims.token_type != expected_type {
        return Err(AuthError::TokenWrongType);
    }
    Ok(data.claims)
}
