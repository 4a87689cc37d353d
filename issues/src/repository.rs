//! Persistence port for issues, comments, and activity. Implemented by the
//! `storage` crate against Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::IssueError;
use crate::model::{EventSummary, Issue, IssueActivity, IssueComment, IssueFilter, IssueStats};

#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn find_issue(&self, id: Uuid) -> Result<Option<Issue>, IssueError>;
    async fn list_issues(
        &self,
        project_id: Uuid,
        filter: &IssueFilter,
    ) -> Result<(Vec<Issue>, u64), IssueError>;
    async fn latest_event(&self, issue_id: Uuid) -> Result<Option<EventSummary>, IssueError>;
    async fn list_events(&self, issue_id: Uuid) -> Result<Vec<EventSummary>, IssueError>;
    async fn comment_count(&self, issue_id: Uuid) -> Result<u64, IssueError>;

    /// Persist a status/assignee mutation together with its activity-log
    /// entry as one atomic unit, mirroring how the tenancy store guarantees
    /// "organization always has an owner" by combining related writes.
    async fn apply_mutation(&self, issue: &Issue, activity: &IssueActivity) -> Result<(), IssueError>;

    /// Persist a comment together with the activity entry it produces.
    async fn insert_comment(
        &self,
        comment: &IssueComment,
        activity: &IssueActivity,
    ) -> Result<(), IssueError>;
    async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<IssueComment>, IssueError>;

    async fn list_activity(&self, issue_id: Uuid) -> Result<Vec<IssueActivity>, IssueError>;

    async fn stats(
        &self,
        project_id: Uuid,
        today_start: DateTime<Utc>,
        week_start: DateTime<Utc>,
        timeline_start: DateTime<Utc>,
    ) -> Result<IssueStats, IssueError>;
}
