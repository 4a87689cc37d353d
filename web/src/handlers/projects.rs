//! `/api/v1/organizations/{orgId}/projects`, `/api/v1/projects/{id}/*` (C4).
//! Project-scoped operations resolve the caller's role via
//! `vigil_tenancy::service::resolve_user_project_role`, which also confirms
//! project existence — a single round trip covers both.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use uuid::Uuid;

use vigil_tenancy::{service, Project, TenancyError};

use crate::dto::{ConfigurationRequest, CreateProjectRequest};
use crate::extractors::AuthUser;
use crate::state::AppState;
use crate::WebResult;

pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(body): Json<CreateProjectRequest>,
) -> WebResult<(StatusCode, Json<Project>)> {
    let role = state
        .tenancy
        .find_member(org_id, auth.user_id)
        .await?
        .map(|m| m.role)
        .ok_or_else(|| TenancyError::Forbidden("not a member of this organization".to_string()))?;
    let project = service::create_project(
        state.tenancy.as_ref(),
        state.clock.as_ref(),
        &state.dsn_host,
        role,
        org_id,
        &body.name,
        &body.slug,
        body.platform,
        body.description,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> WebResult<Json<Vec<Project>>> {
    state
        .tenancy
        .find_member(org_id, auth.user_id)
        .await?
        .ok_or_else(|| TenancyError::Forbidden("not a member of this organization".to_string()))?;
    let projects = state.tenancy.list_projects(org_id).await?;
    Ok(Json(projects))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> WebResult<Json<Project>> {
    let (project, _role) = service::resolve_user_project_role(state.tenancy.as_ref(), auth.user_id, project_id).await?;
    Ok(Json(project))
}

pub async fn regenerate_keys(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> WebResult<Json<Project>> {
    let (_project, role) = service::resolve_user_project_role(state.tenancy.as_ref(), auth.user_id, project_id).await?;
    let project =
        service::regenerate_keys(state.tenancy.as_ref(), state.clock.as_ref(), &state.dsn_host, role, project_id)
            .await?;
    Ok(Json(project))
}

/// `PATCH /projects/{id}/configuration` — currently exposes only the
/// active/inactive flag the core defines (§4.4); there is no broader
/// per-project settings surface in scope.
pub async fn configuration(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<ConfigurationRequest>,
) -> WebResult<Json<Project>> {
    let (_project, role) = service::resolve_user_project_role(state.tenancy.as_ref(), auth.user_id, project_id).await?;
    let project =
        service::set_project_active(state.tenancy.as_ref(), state.clock.as_ref(), role, project_id, body.active)
            .await?;
    Ok(Json(project))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> WebResult<StatusCode> {
    let (_project, role) = service::resolve_user_project_role(state.tenancy.as_ref(), auth.user_id, project_id).await?;
    service::delete_project(state.tenancy.as_ref(), role, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
