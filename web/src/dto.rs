//! Request and response shapes for the management API (§6.2). None of the
//! domain crates derive `Serialize` on their entities beyond what their own
//! wire format needs (e.g. `tenancy::Organization` already round-trips as
//! JSON) — the handful that don't (`Issue`, `IssueComment`, `IssueActivity`,
//! `IssueStats`, `UserRecord`) get a narrow, read-side DTO here so a
//! password hash or an un-serializable aggregate never reaches a response
//! body by accident.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigil_auth::{TokenPair, UserRecord};
use vigil_issues::{
    ActivityType, BulkUpdateResult, EventSummary, Issue, IssueActivity, IssueComment, IssueDetail,
    IssueListPage, IssueStats, IssueStatus, IssueType,
};
use vigil_normalize::Level;
use vigil_tenancy::{OrganizationMember, Platform, Role};

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserDto {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserDto,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl AuthResponse {
    #[must_use]
    pub fn new(user: &UserRecord, tokens: TokenPair) -> Self {
        Self {
            user: UserDto::from(user),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl From<TokenPair> for TokenResponse {
    fn from(tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// `description` uses the classic `Option<Option<T>>` pattern: absent means
/// "leave untouched", `null` means "clear it" (§9's nullable-field note).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct MemberDto {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl From<&OrganizationMember> for MemberDto {
    fn from(member: &OrganizationMember) -> Self {
        Self {
            id: member.id,
            organization_id: member.organization_id,
            user_id: member.user_id,
            role: member.role,
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct ChangeMemberRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub slug: String,
    pub platform: Platform,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigurationRequest {
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct IssueDto {
    pub id: Uuid,
    pub project_id: Uuid,
    pub fingerprint: String,
    pub title: String,
    pub culprit: Option<String>,
    pub issue_type: IssueType,
    pub level: Level,
    pub status: IssueStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub times_seen: u64,
    pub assignee_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Issue> for IssueDto {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id,
            project_id: issue.project_id,
            fingerprint: issue.fingerprint.clone(),
            title: issue.title.clone(),
            culprit: issue.culprit.clone(),
            issue_type: issue.issue_type,
            level: issue.level,
            status: issue.status,
            first_seen: issue.first_seen,
            last_seen: issue.last_seen,
            times_seen: issue.times_seen,
            assignee_id: issue.assignee_id,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventSummaryDto {
    pub id: Uuid,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: Option<String>,
    pub exception_type: Option<String>,
    pub exception_value: Option<String>,
    pub environment: String,
}

impl From<&EventSummary> for EventSummaryDto {
    fn from(event: &EventSummary) -> Self {
        Self {
            id: event.id,
            event_id: event.event_id,
            timestamp: event.timestamp,
            message: event.message.clone(),
            exception_type: event.exception_type.clone(),
            exception_value: event.exception_value.clone(),
            environment: event.environment.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssueListResponse {
    pub items: Vec<IssueDto>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl From<IssueListPage> for IssueListResponse {
    fn from(page: IssueListPage) -> Self {
        Self {
            items: page.items.iter().map(IssueDto::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssueDetailResponse {
    pub issue: IssueDto,
    pub latest_event: Option<EventSummaryDto>,
    pub comment_count: u64,
}

impl From<IssueDetail> for IssueDetailResponse {
    fn from(detail: IssueDetail) -> Self {
        Self {
            issue: IssueDto::from(&detail.issue),
            latest_event: detail.latest_event.as_ref().map(EventSummaryDto::from),
            comment_count: detail.comment_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssueCommentDto {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&IssueComment> for IssueCommentDto {
    fn from(comment: &IssueComment) -> Self {
        Self {
            id: comment.id,
            issue_id: comment.issue_id,
            user_id: comment.user_id,
            content: comment.content.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssueActivityDto {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub user_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<&IssueActivity> for IssueActivityDto {
    fn from(activity: &IssueActivity) -> Self {
        Self {
            id: activity.id,
            issue_id: activity.issue_id,
            user_id: activity.user_id,
            activity_type: activity.activity_type,
            data: activity.data.clone(),
            created_at: activity.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssueStatsResponse {
    pub total: u64,
    pub by_status: Vec<(IssueStatus, u64)>,
    pub by_level: Vec<(Level, u64)>,
    pub by_environment: Vec<(String, u64)>,
    pub new_today: u64,
    pub new_this_week: u64,
    pub top_issues: Vec<IssueDto>,
    pub timeline: Vec<(NaiveDate, u64)>,
}

impl From<IssueStats> for IssueStatsResponse {
    fn from(stats: IssueStats) -> Self {
        Self {
            total: stats.total,
            by_status: stats.by_status,
            by_level: stats.by_level,
            by_environment: stats.by_environment,
            new_today: stats.new_today,
            new_this_week: stats.new_this_week,
            top_issues: stats.top_issues.iter().map(IssueDto::from).collect(),
            timeline: stats.timeline,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueListQuery {
    pub status: Option<String>,
    pub level: Option<String>,
    pub assigned_to: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub environment: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `PATCH /issues/{id}` body. `status`/`note` drive a state-machine
/// transition; `assignee_id` uses the `Option<Option<_>>` pattern so
/// "field absent" (no reassignment) is distinguishable from `null`
/// (un-assign).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateIssueRequest {
    pub status: Option<IssueStatus>,
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "assignee_id")]
pub enum BulkActionRequest {
    Resolve,
    Ignore,
    Unresolve,
    Assign(Option<Uuid>),
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub issue_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub action: BulkActionRequest,
}

#[derive(Debug, Serialize)]
pub struct BulkUpdateResponse {
    pub updated_ids: Vec<Uuid>,
    pub skipped: u32,
    pub not_found: u32,
    pub errors: Vec<BulkUpdateErrorDto>,
}

#[derive(Debug, Serialize)]
pub struct BulkUpdateErrorDto {
    pub id: Uuid,
    pub message: String,
}

impl From<BulkUpdateResult> for BulkUpdateResponse {
    fn from(result: BulkUpdateResult) -> Self {
        Self {
            updated_ids: result.updated_ids,
            skipped: result.skipped,
            not_found: result.not_found,
            errors: result
                .errors
                .into_iter()
                .map(|(id, message)| BulkUpdateErrorDto { id, message })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub project_id: Uuid,
    pub issue_id: Uuid,
    pub created_at: DateTime<Utc>,
}
