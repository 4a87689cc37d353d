//! Registration, authentication, and token refresh orchestration (§4.5).

use uuid::Uuid;
use vigil_core::Clock;

use crate::error::AuthError;
use crate::keys::Keypair;
use crate::model::UserRecord;
use crate::password;
use crate::repository::UserRepository;
use crate::token::{self, TokenPair, TokenPolicy, TokenType};

const BCRYPT_COST: u32 = 12;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(
    repo: &dyn UserRepository,
    clock: &dyn Clock,
    keys: &Keypair,
    policy: &TokenPolicy,
    email: &str,
    plain_password: &str,
    display_name: &str,
) -> Result<(UserRecord, TokenPair), AuthError> {
    let email = normalize_email(email);
    password::validate_strength(plain_password)?;

    if repo.find_by_email(&email).await?.is_some() {
        return Err(AuthError::EmailExists);
    }

    let now = clock.now();
    let password_hash = password::hash(plain_password, BCRYPT_COST)?;
    let user = UserRecord::new(Uuid::new_v4(), email, password_hash, display_name.to_string(), now);
    repo.insert(&user).await?;

    let pair = token::issue_pair(&user, now, policy, keys)?;
    Ok((user, pair))
}

pub async fn authenticate(
    repo: &dyn UserRepository,
    clock: &dyn Clock,
    keys: &Keypair,
    policy: &TokenPolicy,
    email: &str,
    plain_password: &str,
) -> Result<(UserRecord, TokenPair), AuthError> {
    let email = normalize_email(email);
    let user = repo.find_by_email(&email).await?.ok_or(AuthError::InvalidCredentials)?;

    if !user.is_active {
        return Err(AuthError::InactiveAccount);
    }
    if !password::verify(plain_password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials);
    }

    let pair = token::issue_pair(&user, clock.now(), policy, keys)?;
    Ok((user, pair))
}

pub async fn refresh(
    repo: &dyn UserRepository,
    clock: &dyn Clock,
    keys: &Keypair,
    policy: &TokenPolicy,
    refresh_token: &str,
) -> Result<TokenPair, AuthError> {
    let claims = token::validate(refresh_token, TokenType::Refresh, &policy.issuer, keys)?;
    let user = repo.find_by_id(claims.sub).await?.ok_or(AuthError::TokenInvalid)?;

    if !user.is_active {
        return Err(AuthError::InactiveAccount);
    }
    token::issue_pair(&user, clock.now(), policy, keys)
}

pub async fn change_password(
    repo: &dyn UserRepository,
    clock: &dyn Clock,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    let mut user = repo.find_by_id(user_id).await?.ok_or(AuthError::InvalidCredentials)?;

    if !password::verify(current_password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials);
    }
    password::validate_strength(new_password)?;

    user.password_hash = password::hash(new_password, BCRYPT_COST)?;
    user.updated_at = clock.now();
    repo.update(&user).await
}

pub async fn update_profile(
    repo: &dyn UserRepository,
    clock: &dyn Clock,
    user_id: Uuid,
    display_name: &str,
) -> Result<UserRecord, AuthError> {
    let mut user = repo.find_by_id(user_id).await?.ok_or(AuthError::InvalidCredentials)?;
    user.display_name = display_name.to_string();
    user.updated_at = clock.now();
    repo.update(&user).await?;
    Ok(user)
}
