//! Postgres adapter for [`vigil_ingest::IngestRepository`].

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;
use vigil_fingerprint::StackFrame;
use vigil_ingest::{EventRecord, IngestError, IngestRepository};
use vigil_issues::{Issue, IssueStatus, IssueType};
use vigil_normalize::Level;

use crate::error::{classify, SqlFailure};

fn parse_level(s: &str) -> Result<Level, IngestError> {
    s.parse().map_err(|_| IngestError::Internal(format!("corrupt level in storage: {s:?}")))
}

fn parse_issue_type(s: &str) -> Result<IssueType, IngestError> {
    match s {
        "error" => Ok(IssueType::Error),
        "csp" => Ok(IssueType::Csp),
        "default" => Ok(IssueType::Default),
        other => Err(IngestError::Internal(format!("corrupt issue_type in storage: {other:?}"))),
    }
}

pub struct PgIngestRepository {
    pool: PgPool,
}

impl PgIngestRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_issue(row: &sqlx::postgres::PgRow) -> Result<Issue, IngestError> {
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
            status: status_str
                .parse::<IssueStatus>()
                .map_err(|_| IngestError::Internal(format!("corrupt status {status_str:?}")))?,
            first_seen: row.get("first_seen"),
            last_seen: row.get("last_seen"),
            #[allow(clippy::cast_sign_loss)]
            times_seen: row.get::<i64, _>("times_seen") as u64,
            assignee_id: row.get("assignee_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<EventRecord, IngestError> {
        let level_str: String = row.get("level");
        let stack_trace_json: serde_json::Value = row.get("stack_trace");
        let stack_trace: Vec<StackFrame> =
            serde_json::from_value(stack_trace_json).map_err(|e| IngestError::Internal(e.to_string()))?;
        Ok(EventRecord {
            id: row.get("id"),
            issue_id: row.get("issue_id"),
            project_id: row.get("project_id"),
            event_id: row.get("event_id"),
            timestamp: row.get("timestamp"),
            level: parse_level(&level_str)?,
            message: row.get("message"),
            exception_type: row.get("exception_type"),
            exception_value: row.get("exception_value"),
            stack_trace,
            request_data: row.get("request_data"),
            user_context: row.get("user_context"),
            tags: row.get("tags"),
            extra_data: row.get("extra_data"),
            fingerprint: row.get("fingerprint"),
            environment: row.get("environment"),
            release: row.get("release"),
            server_name: row.get("server_name"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl IngestRepository for PgIngestRepository {
    async fn find_issue_by_fingerprint(
        &self,
        project_id: Uuid,
        fingerprint: &str,
    ) -> Result<Option<Issue>, IngestError> {
        let row = sqlx::query("SELECT * FROM issues WHERE project_id = $1 AND fingerprint = $2")
            .bind(project_id)
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::Internal(e.to_string()))?;
        row.as_ref().map(Self::row_to_issue).transpose()
    }

    async fn find_event(&self, project_id: Uuid, event_id: Uuid) -> Result<Option<EventRecord>, IngestError> {
        let row = sqlx::query("SELECT * FROM events WHERE project_id = $1 AND event_id = $2")
            .bind(project_id)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::Internal(e.to_string()))?;
        row.as_ref().map(Self::row_to_event).transpose()
    }

    async fn insert_issue_and_event(&self, issue: &Issue, event: &EventRecord) -> Result<(), IngestError> {
        let mut tx = self.pool.begin().await.map_err(|e| IngestError::Internal(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        let insert_issue = sqlx::query(
            r"
            INSERT INTO issues (
                id, project_id, fingerprint, title, culprit, issue_type, level, status,
                first_seen, last_seen, times_seen, assignee_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(issue.id)
        .bind(issue.project_id)
        .bind(&issue.fingerprint)
        .bind(&issue.title)
        .bind(&issue.culprit)
        .bind(issue.issue_type.to_string())
        .bind(issue.level.to_string())
        .bind(issue.status.as_str())
        .bind(issue.first_seen)
        .bind(issue.last_seen)
        .bind(issue.times_seen as i64)
        .bind(issue.assignee_id)
        .bind(issue.created_at)
        .bind(issue.updated_at)
        .execute(&mut *tx)
        .await;

        // §4.3's concurrency requirement: two submissions racing to create the
        // same (projectId, fingerprint) issue serialize on this unique
        // constraint. The loser's insert fails here; it is not this
        // function's job to retry as an update — the caller resubmits and
        // will find the issue on its next `find_issue_by_fingerprint`.
        insert_issue.map_err(|e| match classify(&e) {
            SqlFailure::UniqueViolation => {
                IngestError::Transient("issue already being created by a concurrent submission".to_string())
            }
            SqlFailure::Other(msg) => IngestError::Internal(msg),
        })?;

        insert_event(&mut tx, event).await?;

        tx.commit().await.map_err(|e| IngestError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn bump_issue_and_insert_event(&self, issue: &Issue, event: &EventRecord) -> Result<(), IngestError> {
        let mut tx = self.pool.begin().await.map_err(|e| IngestError::Internal(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        sqlx::query(
            r"
            UPDATE issues
            SET last_seen = $1, times_seen = $2, title = $3, culprit = $4, level = $5, updated_at = $6
            WHERE id = $7
            ",
        )
        .bind(issue.last_seen)
        .bind(issue.times_seen as i64)
        .bind(&issue.title)
        .bind(&issue.culprit)
        .bind(issue.level.to_string())
        .bind(issue.updated_at)
        .bind(issue.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| IngestError::Internal(e.to_string()))?;

        insert_event(&mut tx, event).await?;

        tx.commit().await.map_err(|e| IngestError::Internal(e.to_string()))?;
        Ok(())
    }
}

async fn insert_event(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, event: &EventRecord) -> Result<(), IngestError> {
    let stack_trace_json =
        serde_json::to_value(&event.stack_trace).map_err(|e| IngestError::Internal(e.to_string()))?;

    let result = sqlx::query(
        r#"
        INSERT INTO events (
            id, issue_id, project_id, event_id, "timestamp", level, message,
            exception_type, exception_value, stack_trace, request_data, user_context,
            tags, extra_data, fingerprint, environment, release, server_name, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        "#,
    )
    .bind(event.id)
    .bind(event.issue_id)
    .bind(event.project_id)
    .bind(event.event_id)
    .bind(event.timestamp)
    .bind(event.level.to_string())
    .bind(&event.message)
    .bind(&event.exception_type)
    .bind(&event.exception_value)
    .bind(stack_trace_json)
    .bind(&event.request_data)
    .bind(&event.user_context)
    .bind(&event.tags)
    .bind(&event.extra_data)
    .bind(&event.fingerprint)
    .bind(&event.environment)
    .bind(&event.release)
    .bind(&event.server_name)
    .bind(event.created_at)
    .execute(&mut **tx)
    .await;

    result.map_err(|e| match classify(&e) {
        SqlFailure::UniqueViolation => {
            IngestError::Transient("event already ingested by a concurrent submission".to_string())
        }
        SqlFailure::Other(msg) => IngestError::Internal(msg),
    })?;
    Ok(())
}
