//! Postgres adapter for [`vigil_issues::IssueRepository`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;
use vigil_issues::{
    ActivityType, AssigneeFilter, EventSummary, Issue, IssueActivity, IssueComment, IssueError, IssueFilter,
    IssueRepository, IssueStats, IssueStatus, IssueType, SortField, SortOrder,
};
use vigil_normalize::Level;

fn parse_level(s: &str) -> Result<Level, IssueError> {
    s.parse().map_err(|_| IssueError::Internal(format!("corrupt level in storage: {s:?}")))
}

fn parse_issue_type(s: &str) -> Result<IssueType, IssueError> {
    match s {
        "error" => Ok(IssueType::Error),
        "csp" => Ok(IssueType::Csp),
        "default" => Ok(IssueType::Default),
        other => Err(IssueError::Internal(format!("corrupt issue_type in storage: {other:?}"))),
    }
}

fn parse_activity_type(s: &str) -> Result<ActivityType, IssueError> {
    match s {
        "status_change" => Ok(ActivityType::StatusChange),
        "assignment" => Ok(ActivityType::Assignment),
        "comment" => Ok(ActivityType::Comment),
        other => Err(IssueError::Internal(format!("corrupt activity_type in storage: {other:?}"))),
    }
}

pub struct PgIssueRepository {
    pool: PgPool,
}

impl PgIssueRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_issue(row: &sqlx::postgres::PgRow) -> Result<Issue, IssueError> {
        let status_str: String = row.get("status");
        let issue_type_str: String = row.get("issue_type");
        let level_str: String = row.get("level");
        Ok(Issue {
            id: row.get("id"),
            project_id: row.get("project_id"),
            fingerprint: row.get("fingerprint"),
            title: row.get("title"),
            culprit: row.get("culprit"),
            issue_type: parse_issue_type(&issue_type_str)?,
            level: parse_level(&level_str)?,
            status: status_str.parse().map_err(|_| IssueError::Internal(format!("corrupt status {status_str:?}")))?,
            first_seen: row.get("first_seen"),
            last_seen: row.get("last_seen"),
            #[allow(clippy::cast_sign_loss)]
            times_seen: row.get::<i64, _>("times_seen") as u64,
            assignee_id: row.get("assignee_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn row_to_comment(row: &sqlx::postgres::PgRow) -> IssueComment {
        IssueComment {
            id: row.get("id"),
            issue_id: row.get("issue_id"),
            user_id: row.get("user_id"),
            content: row.get("content"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn row_to_activity(row: &sqlx::postgres::PgRow) -> Result<IssueActivity, IssueError> {
        let activity_type_str: String = row.get("activity_type");
        Ok(IssueActivity {
            id: row.get("id"),
            issue_id: row.get("issue_id"),
            user_id: row.get("user_id"),
            activity_type: parse_activity_type(&activity_type_str)?,
            data: row.get("data"),
            created_at: row.get("created_at"),
        })
    }

    fn row_to_event_summary(row: &sqlx::postgres::PgRow) -> EventSummary {
        EventSummary {
            id: row.get("id"),
            event_id: row.get("event_id"),
            timestamp: row.get("timestamp"),
            message: row.get("message"),
            exception_type: row.get("exception_type"),
            exception_value: row.get("exception_value"),
            environment: row.get("environment"),
        }
    }
}

#[async_trait]
impl IssueRepository for PgIssueRepository {
    async fn find_issue(&self, id: Uuid) -> Result<Option<Issue>, IssueError> {
        let row = sqlx::query("SELECT * FROM issues WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?;
        row.as_ref().map(Self::row_to_issue).transpose()
    }

    async fn list_issues(&self, project_id: Uuid, filter: &IssueFilter) -> Result<(Vec<Issue>, u64), IssueError> {
        let mut count_qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM issues WHERE project_id = ");
        count_qb.push_bind(project_id);
        push_filter_predicates(&mut count_qb, filter);
        let total: i64 = count_qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?
            .get(0);

        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new("SELECT * FROM issues WHERE project_id = ");
        qb.push_bind(project_id);
        push_filter_predicates(&mut qb, filter);

        let sort_column = match filter.sort {
            Some(SortField::Frequency) => "times_seen",
            Some(SortField::FirstSeen) => "first_seen",
            Some(SortField::LastSeen) | None => "last_seen",
        };
        let direction = match filter.order {
            Some(SortOrder::Asc) => "ASC",
            Some(SortOrder::Desc) | None => "DESC",
        };
        qb.push(format!(" ORDER BY {sort_column} {direction}"));
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(filter.limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(filter.limit * filter.page.saturating_sub(1)));

        let rows = qb.build().fetch_all(&self.pool).await.map_err(|e| IssueError::Internal(e.to_string()))?;
        let issues = rows.iter().map(Self::row_to_issue).collect::<Result<Vec<_>, _>>()?;

        #[allow(clippy::cast_sign_loss)]
        Ok((issues, total as u64))
    }

    async fn latest_event(&self, issue_id: Uuid) -> Result<Option<EventSummary>, IssueError> {
        let row = sqlx::query(
            r#"SELECT id, event_id, "timestamp", message, exception_type, exception_value, environment
               FROM events WHERE issue_id = $1 ORDER BY "timestamp" DESC LIMIT 1"#,
        )
        .bind(issue_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IssueError::Internal(e.to_string()))?;
        Ok(row.as_ref().map(Self::row_to_event_summary))
    }

    async fn list_events(&self, issue_id: Uuid) -> Result<Vec<EventSummary>, IssueError> {
        let rows = sqlx::query(
            r#"SELECT id, event_id, "timestamp", message, exception_type, exception_value, environment
               FROM events WHERE issue_id = $1 ORDER BY "timestamp" DESC LIMIT 100"#,
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IssueError::Internal(e.to_string()))?;
        Ok(rows.iter().map(Self::row_to_event_summary).collect())
    }

    async fn comment_count(&self, issue_id: Uuid) -> Result<u64, IssueError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM issue_comments WHERE issue_id = $1")
            .bind(issue_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?
            .get(0);
        #[allow(clippy::cast_sign_loss)]
        Ok(count as u64)
    }

    async fn apply_mutation(&self, issue: &Issue, activity: &IssueActivity) -> Result<(), IssueError> {
        let mut tx = self.pool.begin().await.map_err(|e| IssueError::Internal(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        sqlx::query(
            r"
            UPDATE issues
            SET status = $1, assignee_id = $2, times_seen = $3, last_seen = $4, updated_at = $5
            WHERE id = $6
            ",
        )
        .bind(issue.status.as_str())
        .bind(issue.assignee_id)
        .bind(issue.times_seen as i64)
        .bind(issue.last_seen)
        .bind(issue.updated_at)
        .bind(issue.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| IssueError::Internal(e.to_string()))?;

        insert_activity(&mut tx, activity).await?;

        tx.commit().await.map_err(|e| IssueError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn insert_comment(&self, comment: &IssueComment, activity: &IssueActivity) -> Result<(), IssueError> {
        let mut tx = self.pool.begin().await.map_err(|e| IssueError::Internal(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO issue_comments (id, issue_id, user_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(comment.id)
        .bind(comment.issue_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| IssueError::Internal(e.to_string()))?;

        insert_activity(&mut tx, activity).await?;

        tx.commit().await.map_err(|e| IssueError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<IssueComment>, IssueError> {
        let rows = sqlx::query("SELECT * FROM issue_comments WHERE issue_id = $1 ORDER BY created_at ASC")
            .bind(issue_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?;
        Ok(rows.iter().map(Self::row_to_comment).collect())
    }

    async fn list_activity(&self, issue_id: Uuid) -> Result<Vec<IssueActivity>, IssueError> {
        let rows = sqlx::query("SELECT * FROM issue_activities WHERE issue_id = $1 ORDER BY created_at ASC")
            .bind(issue_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?;
        rows.iter().map(Self::row_to_activity).collect()
    }

    async fn stats(
        &self,
        project_id: Uuid,
        today_start: DateTime<Utc>,
        week_start: DateTime<Utc>,
        timeline_start: DateTime<Utc>,
    ) -> Result<IssueStats, IssueError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) FROM issues WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?
            .get(0);

        let by_status = sqlx::query("SELECT status, COUNT(*) AS n FROM issues WHERE project_id = $1 GROUP BY status")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?
            .iter()
            .map(|row| -> Result<(IssueStatus, u64), IssueError> {
                let status_str: String = row.get("status");
                #[allow(clippy::cast_sign_loss)]
                let n = row.get::<i64, _>("n") as u64;
                Ok((
                    status_str.parse().map_err(|_| IssueError::Internal(format!("corrupt status {status_str:?}")))?,
                    n,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let by_level = sqlx::query("SELECT level, COUNT(*) AS n FROM issues WHERE project_id = $1 GROUP BY level")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?
            .iter()
            .map(|row| -> Result<(Level, u64), IssueError> {
                let level_str: String = row.get("level");
                #[allow(clippy::cast_sign_loss)]
                let n = row.get::<i64, _>("n") as u64;
                Ok((parse_level(&level_str)?, n))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let by_environment = sqlx::query(
            r"
            SELECT e.environment AS environment, COUNT(DISTINCT e.issue_id) AS n
            FROM events e JOIN issues i ON i.id = e.issue_id
            WHERE i.project_id = $1
            GROUP BY e.environment
            ",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IssueError::Internal(e.to_string()))?
        .iter()
        .map(|row| {
            #[allow(clippy::cast_sign_loss)]
            let n = row.get::<i64, _>("n") as u64;
            (row.get::<String, _>("environment"), n)
        })
        .collect();

        let new_today: i64 = sqlx::query("SELECT COUNT(*) FROM issues WHERE project_id = $1 AND first_seen >= $2")
            .bind(project_id)
            .bind(today_start)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?
            .get(0);

        let new_this_week: i64 = sqlx::query("SELECT COUNT(*) FROM issues WHERE project_id = $1 AND first_seen >= $2")
            .bind(project_id)
            .bind(week_start)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?
            .get(0);

        let top_rows = sqlx::query("SELECT * FROM issues WHERE project_id = $1 ORDER BY times_seen DESC LIMIT 10")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IssueError::Internal(e.to_string()))?;
        let top_issues = top_rows.iter().map(Self::row_to_issue).collect::<Result<Vec<_>, _>>()?;

        let timeline = sqlx::query(
            r"
            SELECT first_seen::date AS day, COUNT(*) AS n
            FROM issues
            WHERE project_id = $1 AND first_seen >= $2
            GROUP BY day
            ORDER BY day ASC
            ",
        )
        .bind(project_id)
        .bind(timeline_start)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IssueError::Internal(e.to_string()))?
        .iter()
        .map(|row| {
            let day: NaiveDate = row.get("day");
            #[allow(clippy::cast_sign_loss)]
            let n = row.get::<i64, _>("n") as u64;
            (day, n)
        })
        .collect();

        #[allow(clippy::cast_sign_loss)]
        Ok(IssueStats {
            total: total as u64,
            by_status,
            by_level,
            by_environment,
            new_today: new_today as u64,
            new_this_week: new_this_week as u64,
            top_issues,
            timeline,
        })
    }
}

async fn insert_activity(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    activity: &IssueActivity,
) -> Result<(), IssueError> {
    let activity_type = match activity.activity_type {
        ActivityType::StatusChange => "status_change",
        ActivityType::Assignment => "assignment",
        ActivityType::Comment => "comment",
    };
    sqlx::query(
        r"
        INSERT INTO issue_activities (id, issue_id, user_id, activity_type, data, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(activity.id)
    .bind(activity.issue_id)
    .bind(activity.user_id)
    .bind(activity_type)
    .bind(&activity.data)
    .bind(activity.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| IssueError::Internal(e.to_string()))?;
    Ok(())
}

fn push_filter_predicates(qb: &mut QueryBuilder<sqlx::Postgres>, filter: &IssueFilter) {
    if !filter.status.is_empty() {
        let statuses: Vec<&str> = filter.status.iter().map(|s| s.as_str()).collect();
        qb.push(" AND status = ANY(");
        qb.push_bind(statuses);
        qb.push(")");
    }
    if !filter.level.is_empty() {
        let levels: Vec<String> = filter.level.iter().map(ToString::to_string).collect();
        qb.push(" AND level = ANY(");
        qb.push_bind(levels);
        qb.push(")");
    }
    match filter.assignee {
        Some(AssigneeFilter::User(user_id)) => {
            qb.push(" AND assignee_id = ");
            qb.push_bind(user_id);
        }
        Some(AssigneeFilter::Unassigned) => {
            qb.push(" AND assignee_id IS NULL");
        }
        None => {}
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND first_seen >= ");
        qb.push_bind(from.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND first_seen <= ");
        qb.push_bind(to.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc());
    }
    if let Some(search) = &filter.search {
        qb.push(" AND title ILIKE ");
        qb.push_bind(format!("%{search}%"));
    }
    if let Some(environment) = &filter.environment {
        qb.push(" AND EXISTS (SELECT 1 FROM events e WHERE e.issue_id = issues.id AND e.environment = ");
        qb.push_bind(environment.clone());
        qb.push(")");
    }
}
