//! Listing, lifecycle, assignment, comments, and statistics orchestration
//! (§4.7). Authorization is resolved by the caller (via `vigil_tenancy`)
//! before any of these functions run; this module only enforces the
//! status state machine and content invariants that are intrinsic to an
//! issue itself.

use chrono::{Datelike, Duration, Timelike, Utc};
use serde_json::json;
use uuid::Uuid;
use vigil_core::Clock;

use crate::error::IssueError;
use crate::model::{
    ActivityType, AssigneeFilter, BulkAction, BulkUpdateResult, Issue, IssueActivity, IssueComment,
    IssueDetail, IssueFilter, IssueListPage, IssueStats, IssueStatus,
};
use crate::repository::IssueRepository;

pub async fn list_issues(
    repo: &dyn IssueRepository,
    project_id: Uuid,
    filter: IssueFilter,
) -> Result<IssueListPage, IssueError> {
    let filter = filter.normalized();
    let (items, total) = repo.list_issues(project_id, &filter).await?;
    Ok(IssueListPage::new(items, total, filter.page, filter.limit))
}

pub async fn get_issue(repo: &dyn IssueRepository, issue_id: Uuid) -> Result<IssueDetail, IssueError> {
    let issue = repo.find_issue(issue_id).await?.ok_or(IssueError::NotFound("issue"))?;
    let latest_event = repo.latest_event(issue_id).await?;
    let comment_count = repo.comment_count(issue_id).await?;
    Ok(IssueDetail { issue, latest_event, comment_count })
}

pub async fn transition_status(
    repo: &dyn IssueRepository,
    clock: &dyn Clock,
    issue_id: Uuid,
    actor_user_id: Option<Uuid>,
    target: IssueStatus,
    note: Option<String>,
) -> Result<Issue, IssueError> {
    let mut issue = repo.find_issue(issue_id).await?.ok_or(IssueError::NotFound("issue"))?;
    issue.status.validate_transition(target)?;

    let data = json!({
        "from": issue.status.as_str(),
        "to": target.as_str(),
        "note": note,
    });
    issue.status = target;
    issue.updated_at = clock.now();

    let activity = IssueActivity {
        id: Uuid::new_v4(),
        issue_id,
        user_id: actor_user_id,
        activity_type: ActivityType::StatusChange,
        data,
        created_at: issue.updated_at,
    };
    repo.apply_mutation(&issue, &activity).await?;
    Ok(issue)
}

pub async fn assign(
    repo: &dyn IssueRepository,
    clock: &dyn Clock,
    issue_id: Uuid,
    actor_user_id: Option<Uuid>,
    assignee_id: Option<Uuid>,
) -> Result<Issue, IssueError> {
    let mut issue = repo.find_issue(issue_id).await?.ok_or(IssueError::NotFound("issue"))?;

    let data = json!({
        "from": issue.assignee_id,
        "to": assignee_id,
    });
    issue.assignee_id = assignee_id;
    issue.updated_at = clock.now();

    let activity = IssueActivity {
        id: Uuid::new_v4(),
        issue_id,
        user_id: actor_user_id,
        activity_type: ActivityType::Assignment,
        data,
        created_at: issue.updated_at,
    };
    repo.apply_mutation(&issue, &activity).await?;
    Ok(issue)
}

pub async fn add_comment(
    repo: &dyn IssueRepository,
    clock: &dyn Clock,
    issue_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> Result<IssueComment, IssueError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(IssueError::Validation("comment content must not be empty".into()));
    }
    repo.find_issue(issue_id).await?.ok_or(IssueError::NotFound("issue"))?;

    let now = clock.now();
    let comment = IssueComment {
        id: Uuid::new_v4(),
        issue_id,
        user_id,
        content: trimmed.to_string(),
        created_at: now,
        updated_at: now,
    };
    let activity = IssueActivity {
        id: Uuid::new_v4(),
        issue_id,
        user_id: Some(user_id),
        activity_type: ActivityType::Comment,
        data: json!({ "comment_id": comment.id, "content": comment.content }),
        created_at: now,
    };
    repo.insert_comment(&comment, &activity).await?;
    Ok(comment)
}

pub async fn list_activity(repo: &dyn IssueRepository, issue_id: Uuid) -> Result<Vec<IssueActivity>, IssueError> {
    repo.list_activity(issue_id).await
}

pub async fn list_comments(repo: &dyn IssueRepository, issue_id: Uuid) -> Result<Vec<IssueComment>, IssueError> {
    repo.list_comments(issue_id).await
}

pub async fn list_events(
    repo: &dyn IssueRepository,
    issue_id: Uuid,
) -> Result<Vec<crate::model::EventSummary>, IssueError> {
    repo.list_events(issue_id).await
}

/// §4.7: each issue in the batch is processed independently; per-issue
/// failures are counted rather than aborting the batch.
pub async fn bulk_update(
    repo: &dyn IssueRepository,
    clock: &dyn Clock,
    issue_ids: &[Uuid],
    actor_user_id: Option<Uuid>,
    action: BulkAction,
) -> Result<BulkUpdateResult, IssueError> {
    if issue_ids.is_empty() || issue_ids.len() > 100 {
        return Err(IssueError::Validation("bulk update accepts between 1 and 100 issue ids".into()));
    }

    let mut result = BulkUpdateResult::default();
    for &issue_id in issue_ids {
        let outcome = match action {
            BulkAction::Resolve => {
                transition_status(repo, clock, issue_id, actor_user_id, IssueStatus::Resolved, None).await
            }
            BulkAction::Ignore => {
                transition_status(repo, clock, issue_id, actor_user_id, IssueStatus::Ignored, None).await
            }
            BulkAction::Unresolve => {
                transition_status(repo, clock, issue_id, actor_user_id, IssueStatus::Unresolved, None).await
            }
            BulkAction::Assign(assignee_id) => assign(repo, clock, issue_id, actor_user_id, assignee_id).await,
        };

        match outcome {
            Ok(_) => result.updated_ids.push(issue_id),
            Err(err @ IssueError::NotFound(_)) => {
                result.not_found += 1;
                result.errors.push((issue_id, err.to_string()));
            }
            Err(err @ IssueError::InvalidTransition { .. }) => {
                result.skipped += 1;
                result.errors.push((issue_id, err.to_string()));
            }
            Err(other) => return Err(other),
        }
    }
    Ok(result)
}

/// Start of the current week, Sunday-based.
fn week_start(now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    let days_since_sunday = i64::from(now.weekday().num_days_from_sunday());
    day_start(now) - Duration::days(days_since_sunday)
}

fn day_start(now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    now.with_hour(0)
        .and_then(|d| d.with_minute(0))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(now)
}

pub async fn stats(repo: &dyn IssueRepository, clock: &dyn Clock, project_id: Uuid) -> Result<IssueStats, IssueError> {
    let now = clock.now();
    let today_start = day_start(now);
    let current_week_start = week_start(now);
    let timeline_start = today_start - Duration::days(30);
    repo.stats(project_id, today_start, current_week_start, timeline_start).await
}

/// Resolve the `assigned_to` query parameter: `unassigned` is a distinct
/// filter from "no filter", not the absence of one.
pub fn parse_assignee_filter(raw: &str) -> Result<AssigneeFilter, IssueError> {
    if raw.eq_ignore_ascii_case("unassigned") {
        return Ok(AssigneeFilter::Unassigned);
    }
    Uuid::parse_str(raw)
        .map(AssigneeFilter::User)
        .map_err(|_| IssueError::Validation(format!("invalid assignee filter {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventSummary, IssueType};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use vigil_core::FixedClock;
    use vigil_normalize::Level;

    struct InMemoryIssues {
        issues: Mutex<HashMap<Uuid, Issue>>,
        comments: Mutex<HashMap<Uuid, Vec<IssueComment>>>,
        activity: Mutex<HashMap<Uuid, Vec<IssueActivity>>>,
    }

    impl InMemoryIssues {
        fn with_issue(issue: Issue) -> Self {
            let mut issues = HashMap::new();
            issues.insert(issue.id, issue);
            Self {
                issues: Mutex::new(issues),
                comments: Mutex::new(HashMap::new()),
                activity: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl IssueRepository for InMemoryIssues {
        async fn find_issue(&self, id: Uuid) -> Result<Option<Issue>, IssueError> {
            Ok(self.issues.lock().expect("lock").get(&id).cloned())
        }

        async fn list_issues(&self, _p: Uuid, _f: &IssueFilter) -> Result<(Vec<Issue>, u64), IssueError> {
            let issues: Vec<_> = self.issues.lock().expect("lock").values().cloned().collect();
            let total = issues.len() as u64;
            Ok((issues, total))
        }

        async fn latest_event(&self, _issue_id: Uuid) -> Result<Option<EventSummary>, IssueError> {
            Ok(None)
        }

        async fn list_events(&self, _issue_id: Uuid) -> Result<Vec<EventSummary>, IssueError> {
            Ok(vec![])
        }

        async fn comment_count(&self, issue_id: Uuid) -> Result<u64, IssueError> {
            Ok(self.comments.lock().expect("lock").get(&issue_id).map_or(0, Vec::len) as u64)
        }

        async fn apply_mutation(&self, issue: &Issue, activity: &IssueActivity) -> Result<(), IssueError> {
            self.issues.lock().expect("lock").insert(issue.id, issue.clone());
            self.activity.lock().expect("lock").entry(issue.id).or_default().push(activity.clone());
            Ok(())
        }

        async fn insert_comment(&self, comment: &IssueComment, activity: &IssueActivity) -> Result<(), IssueError> {
            self.comments.lock().expect("lock").entry(comment.issue_id).or_default().push(comment.clone());
            self.activity.lock().expect("lock").entry(comment.issue_id).or_default().push(activity.clone());
            Ok(())
        }

        async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<IssueComment>, IssueError> {
            Ok(self.comments.lock().expect("lock").get(&issue_id).cloned().unwrap_or_default())
        }

        async fn list_activity(&self, issue_id: Uuid) -> Result<Vec<IssueActivity>, IssueError> {
            Ok(self.activity.lock().expect("lock").get(&issue_id).cloned().unwrap_or_default())
        }

        async fn stats(
            &self,
            _project_id: Uuid,
            _today_start: chrono::DateTime<Utc>,
            _week_start: chrono::DateTime<Utc>,
            _timeline_start: chrono::DateTime<Utc>,
        ) -> Result<IssueStats, IssueError> {
            unimplemented!("not exercised by these tests")
        }
    }

    fn sample_issue() -> Issue {
        let now = Utc::now();
        Issue {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            fingerprint: "abc123".into(),
            title: "TypeError: x is not a function".into(),
            culprit: Some("handler at app.js:10".into()),
            issue_type: IssueType::Error,
            level: Level::Error,
            status: IssueStatus::Unresolved,
            first_seen: now,
            last_seen: now,
            times_seen: 1,
            assignee_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn resolving_an_unresolved_issue_succeeds_and_logs_activity() {
        let issue = sample_issue();
        let id = issue.id;
        let repo = InMemoryIssues::with_issue(issue);
        let clock = FixedClock::new(Utc::now());

        let updated = transition_status(&repo, &clock, id, None, IssueStatus::Resolved, None).await.expect("resolve");
        assert_eq!(updated.status, IssueStatus::Resolved);

        let activity = list_activity(&repo, id).await.expect("activity");
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].activity_type, ActivityType::StatusChange);
    }

    #[tokio::test]
    async fn resolving_a_resolved_issue_is_rejected() {
        let mut issue = sample_issue();
        issue.status = IssueStatus::Resolved;
        let id = issue.id;
        let repo = InMemoryIssues::with_issue(issue);
        let clock = FixedClock::new(Utc::now());

        let err = transition_status(&repo, &clock, id, None, IssueStatus::Resolved, None).await.unwrap_err();
        assert!(matches!(err, IssueError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn assigning_and_unassigning_both_log_activity() {
        let issue = sample_issue();
        let id = issue.id;
        let repo = InMemoryIssues::with_issue(issue);
        let clock = FixedClock::new(Utc::now());
        let user = Uuid::new_v4();

        let assigned = assign(&repo, &clock, id, Some(user), Some(user)).await.expect("assign");
        assert_eq!(assigned.assignee_id, Some(user));
        let unassigned = assign(&repo, &clock, id, Some(user), None).await.expect("unassign");
        assert_eq!(unassigned.assignee_id, None);

        assert_eq!(list_activity(&repo, id).await.expect("activity").len(), 2);
    }

    #[tokio::test]
    async fn empty_comment_is_rejected() {
        let issue = sample_issue();
        let id = issue.id;
        let repo = InMemoryIssues::with_issue(issue);
        let clock = FixedClock::new(Utc::now());

        let err = add_comment(&repo, &clock, id, Uuid::new_v4(), "   ").await.unwrap_err();
        assert!(matches!(err, IssueError::Validation(_)));
    }

    #[tokio::test]
    async fn adding_a_comment_also_logs_a_comment_activity() {
        let issue = sample_issue();
        let id = issue.id;
        let repo = InMemoryIssues::with_issue(issue);
        let clock = FixedClock::new(Utc::now());

        add_comment(&repo, &clock, id, Uuid::new_v4(), "looks like a flake").await.expect("comment");
        assert_eq!(list_comments(&repo, id).await.expect("comments").len(), 1);
        let activity = list_activity(&repo, id).await.expect("activity");
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].activity_type, ActivityType::Comment);
    }

    #[tokio::test]
    async fn bulk_update_counts_invalid_transitions_as_skipped_not_errors() {
        let mut resolved = sample_issue();
        resolved.status = IssueStatus::Resolved;
        let resolved_id = resolved.id;
        let unresolved = sample_issue();
        let unresolved_id = unresolved.id;
        let missing_id = Uuid::new_v4();

        let repo = InMemoryIssues::with_issue(resolved);
        repo.issues.lock().expect("lock").insert(unresolved.id, unresolved);
        let clock = FixedClock::new(Utc::now());

        let result = bulk_update(
            &repo,
            &clock,
            &[unresolved_id, resolved_id, missing_id],
            None,
            BulkAction::Resolve,
        )
        .await
        .expect("bulk update");

        assert_eq!(result.updated_ids, vec![unresolved_id]);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.not_found, 1);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|(id, _)| *id == resolved_id));
        assert!(result.errors.iter().any(|(id, _)| *id == missing_id));
    }

    #[tokio::test]
    async fn bulk_update_rejects_an_empty_or_oversized_batch() {
        let repo = InMemoryIssues::with_issue(sample_issue());
        let clock = FixedClock::new(Utc::now());

        assert!(bulk_update(&repo, &clock, &[], None, BulkAction::Resolve).await.is_err());
        let too_many: Vec<Uuid> = (0..101).map(|_| Uuid::new_v4()).collect();
        assert!(bulk_update(&repo, &clock, &too_many, None, BulkAction::Resolve).await.is_err());
    }

    #[test]
    fn assignee_filter_recognizes_the_unassigned_sentinel() {
        assert_eq!(parse_assignee_filter("unassigned").expect("parse"), AssigneeFilter::Unassigned);
        assert_eq!(parse_assignee_filter("UNASSIGNED").expect("parse"), AssigneeFilter::Unassigned);
        assert!(parse_assignee_filter("not-a-uuid").is_err());
    }
}
