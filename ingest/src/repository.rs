//! Persistence port for the ingestion pipeline. Implemented by the
//! `storage` crate against Postgres using an insert-or-select pattern
//! serialized on the unique `(projectId, fingerprint)` and `(projectId,
//! eventId)` constraints (§4.3, §5).

use async_trait::async_trait;
use uuid::Uuid;
use vigil_issues::Issue;

use crate::error::IngestError;
use crate::model::EventRecord;

#[async_trait]
pub trait IngestRepository: Send + Sync {
    async fn find_issue_by_fingerprint(
        &self,
        project_id: Uuid,
        fingerprint: &str,
    ) -> Result<Option<Issue>, IngestError>;

    async fn find_event(&self, project_id: Uuid, event_id: Uuid) -> Result<Option<EventRecord>, IngestError>;

    /// Insert a brand-new issue together with its first event, atomically.
    async fn insert_issue_and_event(&self, issue: &Issue, event: &EventRecord) -> Result<(), IngestError>;

    /// Bump an existing issue's `lastSeen`/`timesSeen` and insert the new
    /// event, atomically. Must not be called for a duplicate event — the
    /// caller checks `find_event` first.
    async fn bump_issue_and_insert_event(&self, issue: &Issue, event: &EventRecord) -> Result<(), IngestError>;
}
