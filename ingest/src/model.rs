//! The `Event` entity (§3) and the outcome the pipeline reports back.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;
use vigil_fingerprint::StackFrame;
use vigil_normalize::Level;

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub project_id: Uuid,
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: Option<String>,
    pub exception_type: Option<String>,
    pub exception_value: Option<String>,
    pub stack_trace: Vec<StackFrame>,
    pub request_data: Option<Value>,
    pub user_context: Option<Value>,
    pub tags: Value,
    pub extra_data: Value,
    pub fingerprint: String,
    pub environment: String,
    pub release: Option<String>,
    pub server_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What the pipeline hands back to the transport layer (§6.1 response body).
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub internal_id: Uuid,
    pub event_id: Uuid,
    pub project_id: Uuid,
    pub issue_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// `true` when this was a duplicate `(projectId, eventId)` resubmission;
    /// the ids returned are the original event's, and issue stats were left
    /// untouched.
    pub already_ingested: bool,
}
