//! `/api/v1/projects/{id}/issues*`, `/api/v1/issues/{id}/*` (C7). Every
//! handler resolves the caller's membership in the issue's project before
//! touching `vigil_issues::service` — issues carry no role table of their
//! own (§4.6 only gates organization/project operations), so membership
//! alone is the bar here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use vigil_issues::{model::{BulkAction, IssueFilter, SortField, SortOrder}, service, IssueError};
use vigil_normalize::Level;
use vigil_tenancy::service as tenancy_service;

use crate::dto::{
    AddCommentRequest, BulkActionRequest, BulkUpdateRequest, BulkUpdateResponse, IssueActivityDto, IssueCommentDto,
    IssueDetailResponse, IssueListQuery, IssueListResponse, IssueStatsResponse, UpdateIssueRequest,
};
use crate::extractors::AuthUser;
use crate::state::AppState;
use crate::WebResult;

fn parse_filter(query: IssueListQuery) -> Result<IssueFilter, IssueError> {
    let status = query
        .status
        .as_deref()
        .map(|csv| csv.split(',').map(str::parse).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    let level = query
        .level
        .as_deref()
        .map(|csv| csv.split(',').map(str::parse::<Level>).collect::<Result<Vec<_>, _>>())
        .transpose()
        .map_err(|_| IssueError::Validation("invalid level in filter".to_string()))?
        .unwrap_or_default();
    let assignee = query.assigned_to.as_deref().map(service::parse_assignee_filter).transpose()?;
    let sort = query
        .sort
        .as_deref()
        .map(|s| match s {
            "frequency" => Ok(SortField::Frequency),
            "first_seen" => Ok(SortField::FirstSeen),
            "last_seen" => Ok(SortField::LastSeen),
            other => Err(IssueError::Validation(format!("unknown sort field {other:?}"))),
        })
        .transpose()?;
    let order = query
        .order
        .as_deref()
        .map(|s| match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(IssueError::Validation(format!("unknown sort order {other:?}"))),
        })
        .transpose()?;

    Ok(IssueFilter {
        status,
        level,
        assignee,
        date_from: query.date_from,
        date_to: query.date_to,
        environment: query.environment,
        search: query.search,
        sort,
        order,
        page: non_negative_or_zero(query.page),
        limit: non_negative_or_zero(query.limit),
    }
    .normalized())
}

/// A negative page/limit coerces to the same "use the default" signal as an
/// explicit 0 (§8's boundary behavior); `IssueFilter::normalized` turns that
/// 0 into the actual default.
fn non_negative_or_zero(value: Option<i64>) -> u32 {
    value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
}

async fn require_project_membership(state: &AppState, user_id: Uuid, project_id: Uuid) -> WebResult<()> {
    tenancy_service::resolve_user_project_role(state.tenancy.as_ref(), user_id, project_id).await?;
    Ok(())
}

async fn require_issue_membership(state: &AppState, user_id: Uuid, issue_id: Uuid) -> WebResult<vigil_issues::Issue> {
    let issue = state.issues.find_issue(issue_id).await?.ok_or(IssueError::NotFound("issue"))?;
    require_project_membership(state, user_id, issue.project_id).await?;
    Ok(issue)
}

pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<IssueListQuery>,
) -> WebResult<Json<IssueListResponse>> {
    require_project_membership(&state, auth.user_id, project_id).await?;
    let filter = parse_filter(query)?;
    let page = service::list_issues(state.issues.as_ref(), project_id, filter).await?;
    Ok(Json(page.into()))
}

pub async fn stats(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> WebResult<Json<IssueStatsResponse>> {
    require_project_membership(&state, auth.user_id, project_id).await?;
    let stats = service::stats(state.issues.as_ref(), state.clock.as_ref(), project_id).await?;
    Ok(Json(stats.into()))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
) -> WebResult<Json<IssueDetailResponse>> {
    require_issue_membership(&state, auth.user_id, issue_id).await?;
    let detail = service::get_issue(state.issues.as_ref(), issue_id).await?;
    Ok(Json(detail.into()))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
    Json(body): Json<UpdateIssueRequest>,
) -> WebResult<Json<crate::dto::IssueDto>> {
    require_issue_membership(&state, auth.user_id, issue_id).await?;

    let mut issue = None;
    if let Some(status) = body.status {
        issue = Some(
            service::transition_status(
                state.issues.as_ref(),
                state.clock.as_ref(),
                issue_id,
                Some(auth.user_id),
                status,
                body.note,
            )
            .await?,
        );
    }
    if let Some(assignee_id) = body.assignee_id {
        issue = Some(
            service::assign(state.issues.as_ref(), state.clock.as_ref(), issue_id, Some(auth.user_id), assignee_id)
                .await?,
        );
    }
    let issue = match issue {
        Some(issue) => issue,
        None => service::get_issue(state.issues.as_ref(), issue_id).await?.issue,
    };
    Ok(Json((&issue).into()))
}

pub async fn list_comments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
) -> WebResult<Json<Vec<IssueCommentDto>>> {
    require_issue_membership(&state, auth.user_id, issue_id).await?;
    let comments = service::list_comments(state.issues.as_ref(), issue_id).await?;
    Ok(Json(comments.iter().map(IssueCommentDto::from).collect()))
}

pub async fn add_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
    Json(body): Json<AddCommentRequest>,
) -> WebResult<(StatusCode, Json<IssueCommentDto>)> {
    require_issue_membership(&state, auth.user_id, issue_id).await?;
    let comment =
        service::add_comment(state.issues.as_ref(), state.clock.as_ref(), issue_id, auth.user_id, &body.content)
            .await?;
    Ok((StatusCode::CREATED, Json(IssueCommentDto::from(&comment))))
}

pub async fn list_activity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
) -> WebResult<Json<Vec<IssueActivityDto>>> {
    require_issue_membership(&state, auth.user_id, issue_id).await?;
    let activity = service::list_activity(state.issues.as_ref(), issue_id).await?;
    Ok(Json(activity.iter().map(IssueActivityDto::from).collect()))
}

pub async fn list_events(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(issue_id): Path<Uuid>,
) -> WebResult<Json<Vec<crate::dto::EventSummaryDto>>> {
    require_issue_membership(&state, auth.user_id, issue_id).await?;
    let events = service::list_events(state.issues.as_ref(), issue_id).await?;
    Ok(Json(events.iter().map(crate::dto::EventSummaryDto::from).collect()))
}

/// `POST /issues/bulk-update`. Issues in a batch may span several
/// projects; per-issue `NotFound` is how cross-tenant ids are rejected
/// without a separate membership check per item, matching §4.7's
/// per-issue independence requirement.
pub async fn bulk_update(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkUpdateRequest>,
) -> WebResult<Json<BulkUpdateResponse>> {
    let action = match body.action {
        BulkActionRequest::Resolve => BulkAction::Resolve,
        BulkActionRequest::Ignore => BulkAction::Ignore,
        BulkActionRequest::Unresolve => BulkAction::Unresolve,
        BulkActionRequest::Assign(assignee_id) => BulkAction::Assign(assignee_id),
    };
    let result = service::bulk_update(state.issues.as_ref(), state.clock.as_ref(), &body.issue_ids, None, action)
        .await?;
    Ok(Json(result.into()))
}
