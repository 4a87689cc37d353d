//! Issue, comment, and activity entities, plus the listing/filter and
//! statistics shapes the service computes over them (§3, §4.7).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use vigil_normalize::Level;

use crate::error::IssueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Unresolved,
    Resolved,
    Ignored,
}

impl IssueStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Resolved => "resolved",
            Self::Ignored => "ignored",
        }
    }

    /// The legal next states from this one (§4.7's state machine).
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Unresolved => &[Self::Resolved, Self::Ignored],
            Self::Resolved => &[Self::Unresolved],
            Self::Ignored => &[Self::Unresolved],
        }
    }

    pub fn validate_transition(self, target: Self) -> Result<(), IssueError> {
        if self.allowed_transitions().contains(&target) {
            Ok(())
        } else {
            Err(IssueError::InvalidTransition { from: self.as_str(), to: target.as_str() })
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unresolved" => Ok(Self::Unresolved),
            "resolved" => Ok(Self::Resolved),
            "ignored" => Ok(Self::Ignored),
            other => Err(IssueError::Validation(format!("unknown issue status {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Error,
    Csp,
    Default,
}

impl IssueType {
    /// §4.3: `csp` when the exception type contains "csp" (case-insensitive), else `error`.
    #[must_use]
    pub fn classify(exception_type: Option<&str>) -> Self {
        match exception_type {
            Some(t) if t.to_ascii_lowercase().contains("csp") => Self::Csp,
            _ => Self::Error,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Csp => "csp",
            Self::Default => "default",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Issue {
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

/// The projection of an event the issue service needs for "latest event"
/// embeds and environment filtering; owning the full event record is the
/// ingestion pipeline's job.
#[derive(Debug, Clone)]
pub struct EventSummary {
    pub id: Uuid,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: Option<String>,
    pub exception_type: Option<String>,
    pub exception_value: Option<String>,
    pub environment: String,
}

#[derive(Debug, Clone)]
pub struct IssueComment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    StatusChange,
    Assignment,
    Comment,
}

#[derive(Debug, Clone)]
pub struct IssueActivity {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub user_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// `unassigned` is a distinct filter value from "no filter at all".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeFilter {
    User(Uuid),
    Unassigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Frequency,
    FirstSeen,
    LastSeen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Vec<IssueStatus>,
    pub level: Vec<Level>,
    pub assignee: Option<AssigneeFilter>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub environment: Option<String>,
    pub search: Option<String>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
    pub page: u32,
    pub limit: u32,
}

impl IssueFilter {
    pub const DEFAULT_LIMIT: u32 = 25;
    pub const MAX_LIMIT: u32 = 100;

    /// Clamp page to ≥1 and limit to [1, 100], defaulting limit to 25.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = match self.limit {
            0 => Self::DEFAULT_LIMIT,
            n => n.min(Self::MAX_LIMIT),
        };
        self
    }
}

#[derive(Debug, Clone)]
pub struct IssueListPage {
    pub items: Vec<Issue>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl IssueListPage {
    #[must_use]
    pub fn new(items: Vec<Issue>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = total.div_ceil(u64::from(limit)).max(1);
        Self { items, total, page, limit, total_pages }
    }
}

#[derive(Debug, Clone)]
pub struct IssueDetail {
    pub issue: Issue,
    pub latest_event: Option<EventSummary>,
    pub comment_count: u64,
}

#[derive(Debug, Clone)]
pub struct IssueStats {
    pub total: u64,
    pub by_status: Vec<(IssueStatus, u64)>,
    pub by_level: Vec<(Level, u64)>,
    pub by_environment: Vec<(String, u64)>,
    pub new_today: u64,
    pub new_this_week: u64,
    pub top_issues: Vec<Issue>,
    pub timeline: Vec<(NaiveDate, u64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Resolve,
    Ignore,
    Unresolve,
    Assign(Option<Uuid>),
}

#[derive(Debug, Clone, Default)]
pub struct BulkUpdateResult {
    pub updated_ids: Vec<Uuid>,
    pub skipped: u32,
    pub not_found: u32,
    /// `(issue_id, message)` for every id that failed, e.g. an invalid
    /// status transition. Lets a caller show *which* id in a bulk request
    /// needs attention instead of just a skip count.
    pub errors: Vec<(Uuid, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_can_become_resolved_or_ignored_but_nothing_else() {
        assert!(IssueStatus::Unresolved.validate_transition(IssueStatus::Resolved).is_ok());
        assert!(IssueStatus::Unresolved.validate_transition(IssueStatus::Ignored).is_ok());
        assert!(IssueStatus::Unresolved.validate_transition(IssueStatus::Unresolved).is_err());
    }

    #[test]
    fn resolved_and_ignored_can_only_reopen() {
        assert!(IssueStatus::Resolved.validate_transition(IssueStatus::Unresolved).is_ok());
        assert!(IssueStatus::Resolved.validate_transition(IssueStatus::Ignored).is_err());
        assert!(IssueStatus::Ignored.validate_transition(IssueStatus::Unresolved).is_ok());
        assert!(IssueStatus::Ignored.validate_transition(IssueStatus::Resolved).is_err());
    }

    #[test]
    fn issue_type_classifies_csp_case_insensitively() {
        assert_eq!(IssueType::classify(Some("CSPViolation")), IssueType::Csp);
        assert_eq!(IssueType::classify(Some("TypeError")), IssueType::Error);
        assert_eq!(IssueType::classify(None), IssueType::Error);
    }

    #[test]
    fn filter_normalization_clamps_limit_and_defaults_it() {
        let f = IssueFilter { limit: 0, ..Default::default() }.normalized();
        assert_eq!(f.limit, IssueFilter::DEFAULT_LIMIT);
        let f = IssueFilter { limit: 500, ..Default::default() }.normalized();
        assert_eq!(f.limit, IssueFilter::MAX_LIMIT);
        let f = IssueFilter { page: 0, ..Default::default() }.normalized();
        assert_eq!(f.page, 1);
    }

    #[test]
    fn list_page_computes_total_pages_via_ceiling_division() {
        let page = IssueListPage::new(vec![], 51, 1, 25);
        assert_eq!(page.total_pages, 3);
        let page = IssueListPage::new(vec![], 0, 1, 25);
        assert_eq!(page.total_pages, 1);
    }
}
