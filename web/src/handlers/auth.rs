//! `/api/v1/auth/*` — registration, login, refresh, and profile self-service
//! (C5). Register/login/refresh are public per §6.2; change-password and
//! profile update require [`crate::extractors::AuthUser`].

use axum::{extract::State, http::StatusCode, Json};

use vigil_auth::service;

use crate::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest, TokenResponse, UserDto,
    UpdateProfileRequest,
};
use crate::extractors::AuthUser;
use crate::state::AppState;
use crate::WebResult;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> WebResult<(StatusCode, Json<AuthResponse>)> {
    let (user, tokens) = service::register(
        state.users.as_ref(),
        state.clock.as_ref(),
        &state.keys,
        &state.token_policy,
        &body.email,
        &body.password,
        &body.display_name,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::new(&user, tokens))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> WebResult<Json<AuthResponse>> {
    let (user, tokens) = service::authenticate(
        state.users.as_ref(),
        state.clock.as_ref(),
        &state.keys,
        &state.token_policy,
        &body.email,
        &body.password,
    )
    .await?;
    Ok(Json(AuthResponse::new(&user, tokens)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> WebResult<Json<TokenResponse>> {
    let tokens = service::refresh(
        state.users.as_ref(),
        state.clock.as_ref(),
        &state.keys,
        &state.token_policy,
        &body.refresh_token,
    )
    .await?;
    Ok(Json(tokens.into()))
}

pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> WebResult<StatusCode> {
    service::change_password(
        state.users.as_ref(),
        state.clock.as_ref(),
        auth.user_id,
        &body.current_password,
        &body.new_password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<UpdateProfileRequest>,
) -> WebResult<Json<UserDto>> {
    let user = service::update_profile(
        state.users.as_ref(),
        state.clock.as_ref(),
        auth.user_id,
        &body.display_name,
    )
    .await?;
    Ok(Json(UserDto::from(&user)))
}
