//! `/api/v1/organizations/*` (C4 + C6). Every mutation resolves the
//! caller's membership role first, then defers the actual permission
//! check to `vigil_tenancy::service`, which calls `authz::authorize`
//! internally — this module only ever resolves "what role does this
//! user hold", never re-implements the threshold table.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use uuid::Uuid;

use vigil_tenancy::{service, Organization, Role, TenancyError};

use crate::dto::{AddMemberRequest, ChangeMemberRoleRequest, CreateOrganizationRequest, MemberDto, UpdateOrganizationRequest};
use crate::extractors::AuthUser;
use crate::state::AppState;
use crate::WebResult;

async fn actor_role(state: &AppState, organization_id: Uuid, user_id: Uuid) -> WebResult<Role> {
    let member = state.tenancy.find_member(organization_id, user_id).await?;
    member
        .map(|m| m.role)
        .ok_or_else(|| TenancyError::Forbidden("not a member of this organization".to_string()).into())
}

pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateOrganizationRequest>,
) -> WebResult<(StatusCode, Json<Organization>)> {
    let org = service::create_organization(
        state.tenancy.as_ref(),
        state.clock.as_ref(),
        auth.user_id,
        &body.name,
        &body.slug,
        body.description,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(org)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> WebResult<Json<Organization>> {
    actor_role(&state, org_id, auth.user_id).await?;
    let org = state
        .tenancy
        .find_organization(org_id)
        .await?
        .ok_or(TenancyError::NotFound("organization"))?;
    Ok(Json(org))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(body): Json<UpdateOrganizationRequest>,
) -> WebResult<Json<Organization>> {
    let role = actor_role(&state, org_id, auth.user_id).await?;
    let org = service::update_organization(
        state.tenancy.as_ref(),
        state.clock.as_ref(),
        role,
        org_id,
        body.name,
        body.description,
    )
    .await?;
    Ok(Json(org))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> WebResult<StatusCode> {
    let role = actor_role(&state, org_id, auth.user_id).await?;
    service::delete_organization(state.tenancy.as_ref(), role, org_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> WebResult<Json<Vec<MemberDto>>> {
    actor_role(&state, org_id, auth.user_id).await?;
    let members = state.tenancy.list_members(org_id).await?;
    Ok(Json(members.iter().map(MemberDto::from).collect()))
}

pub async fn add_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> WebResult<(StatusCode, Json<MemberDto>)> {
    let role = actor_role(&state, org_id, auth.user_id).await?;
    let member = service::add_member(
        state.tenancy.as_ref(),
        state.clock.as_ref(),
        role,
        org_id,
        body.user_id,
        body.role,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(MemberDto::from(&member))))
}

pub async fn change_member_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ChangeMemberRoleRequest>,
) -> WebResult<StatusCode> {
    let role = actor_role(&state, org_id, auth.user_id).await?;
    service::change_member_role(state.tenancy.as_ref(), role, org_id, user_id, body.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> WebResult<StatusCode> {
    let role = actor_role(&state, org_id, auth.user_id).await?;
    service::remove_member(state.tenancy.as_ref(), role, org_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
