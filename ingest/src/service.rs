//! The ingestion pipeline itself (§4.3): resolve credential → normalize →
//! fingerprint → upsert issue → insert event, as one logical unit of work.
//! The actual transaction boundary lives in the `storage` crate's
//! `IngestRepository` implementation; this module only sequences the steps
//! and decides what gets written.

use serde_json::{json, Value};
use uuid::Uuid;
use vigil_core::Clock;
use vigil_fingerprint::{self as fingerprint, StackFrame};
use vigil_issues::{Issue, IssueStatus, IssueType};
use vigil_normalize::{self as normalize, NormalizedEvent, RawEnvelope};
use vigil_tenancy::{service as tenancy_service, TenancyRepository};

use crate::credential::Credential;
use crate::error::IngestError;
use crate::model::{EventRecord, IngestOutcome};
use crate::repository::IngestRepository;

const UNKNOWN_ERROR_TITLE: &str = "Unknown Error";

pub async fn ingest(
    tenancy_repo: &dyn TenancyRepository,
    ingest_repo: &dyn IngestRepository,
    clock: &dyn Clock,
    credential: &Credential,
    raw: RawEnvelope,
    client_ip: Option<String>,
    user_agent: Option<String>,
) -> Result<IngestOutcome, IngestError> {
    let project = tenancy_service::resolve_project_by_credential(tenancy_repo, credential.as_resolvable()).await?;

    let normalized = normalize::normalize(raw, client_ip, user_agent, clock)?;
    let fingerprint = fingerprint::compute(&normalized.fingerprint_input());

    if let Some(existing) = ingest_repo.find_event(project.id, normalized.event_id).await? {
        return Ok(IngestOutcome {
            internal_id: existing.id,
            event_id: existing.event_id,
            project_id: existing.project_id,
            issue_id: existing.issue_id,
            created_at: existing.created_at,
            already_ingested: true,
        });
    }

    let now = clock.now();
    match ingest_repo.find_issue_by_fingerprint(project.id, &fingerprint).await? {
        None => {
            let issue = new_issue(project.id, fingerprint.clone(), &normalized);
            let event = build_event(&issue, &normalized, &fingerprint, now);
            ingest_repo.insert_issue_and_event(&issue, &event).await?;
            Ok(IngestOutcome {
                internal_id: event.id,
                event_id: event.event_id,
                project_id: project.id,
                issue_id: issue.id,
                created_at: event.created_at,
                already_ingested: false,
            })
        }
        Some(mut issue) => {
            issue.last_seen = now;
            issue.times_seen += 1;
            issue.updated_at = now;
            let event = build_event(&issue, &normalized, &fingerprint, now);
            ingest_repo.bump_issue_and_insert_event(&issue, &event).await?;
            Ok(IngestOutcome {
                internal_id: event.id,
                event_id: event.event_id,
                project_id: project.id,
                issue_id: issue.id,
                created_at: event.created_at,
                already_ingested: false,
            })
        }
    }
}

fn new_issue(project_id: Uuid, fingerprint: String, normalized: &NormalizedEvent) -> Issue {
    Issue {
        id: Uuid::new_v4(),
        project_id,
        fingerprint,
        title: derive_title(normalized),
        culprit: derive_culprit(&normalized.stack_trace),
        issue_type: IssueType::classify(normalized.exception_type.as_deref()),
        level: normalized.level,
        status: IssueStatus::Unresolved,
        first_seen: normalized.timestamp,
        last_seen: normalized.timestamp,
        times_seen: 1,
        assignee_id: None,
        created_at: normalized.timestamp,
        updated_at: normalized.timestamp,
    }
}

fn build_event(issue: &Issue, normalized: &NormalizedEvent, fingerprint: &str, created_at: chrono::DateTime<chrono::Utc>) -> EventRecord {
    EventRecord {
        id: Uuid::new_v4(),
        issue_id: issue.id,
        project_id: issue.project_id,
        event_id: normalized.event_id,
        timestamp: normalized.timestamp,
        level: normalized.level,
        message: normalized.message.clone(),
        exception_type: normalized.exception_type.clone(),
        exception_value: normalized.exception_value.clone(),
        stack_trace: normalized.stack_trace.clone(),
        request_data: normalized.request_context.clone(),
        user_context: normalized.user_context.clone(),
        tags: tags_to_json(&normalized.tags),
        extra_data: Value::Object(normalized.extra.clone()),
        fingerprint: fingerprint.to_string(),
        environment: normalized.environment.clone(),
        release: normalized.release.clone(),
        server_name: normalized.server_name.clone(),
        created_at,
    }
}

fn tags_to_json(tags: &std::collections::BTreeMap<String, String>) -> Value {
    json!(tags)
}

/// §4.3 step 3: `"<ExceptionType>: <ExceptionValue>"` when both present,
/// else the message, else the exception type alone, else a fixed fallback.
fn derive_title(normalized: &NormalizedEvent) -> String {
    match (&normalized.exception_type, &normalized.exception_value) {
        (Some(t), Some(v)) => format!("{t}: {v}"),
        _ => normalized
            .message
            .clone()
            .or_else(|| normalized.exception_type.clone())
            .unwrap_or_else(|| UNKNOWN_ERROR_TITLE.to_string()),
    }
}

/// §4.3 step 3: `<function> at <basename>:<line>` from the first in-app
/// frame, falling back to the first frame at all.
fn derive_culprit(frames: &[StackFrame]) -> Option<String> {
    let frame = frames.iter().find(|f| f.in_app).or_else(|| frames.first())?;
    let function = frame.function.as_deref().unwrap_or("<anonymous>");
    let basename = frame.filename.as_deref().map(basename_of).unwrap_or_default();
    let line = frame.lineno.unwrap_or(0);
    Some(format!("{function} at {basename}:{line}"))
}

fn basename_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use vigil_core::FixedClock;
    use vigil_normalize::{RawException, RawExceptionValue};
    use vigil_tenancy::dsn;
    use vigil_tenancy::{Organization, OrganizationMember, Platform, Project, Role, TenancyError};

    struct InMemoryTenancy {
        project: Project,
    }

    #[async_trait]
    impl TenancyRepository for InMemoryTenancy {
        async fn insert_organization_with_owner(&self, _o: &Organization, _m: &OrganizationMember) -> Result<(), TenancyError> {
            unimplemented!()
        }
        async fn find_organization(&self, _id: Uuid) -> Result<Option<Organization>, TenancyError> {
            unimplemented!()
        }
        async fn find_organization_by_slug(&self, _s: &str) -> Result<Option<Organization>, TenancyError> {
            unimplemented!()
        }
        async fn update_organization(&self, _o: &Organization) -> Result<(), TenancyError> {
            unimplemented!()
        }
        async fn delete_organization(&self, _id: Uuid) -> Result<(), TenancyError> {
            unimplemented!()
        }
        async fn insert_member(&self, _m: &OrganizationMember) -> Result<(), TenancyError> {
            unimplemented!()
        }
        async fn find_member(&self, _o: Uuid, _u: Uuid) -> Result<Option<OrganizationMember>, TenancyError> {
            unimplemented!()
        }
        async fn list_members(&self, _o: Uuid) -> Result<Vec<OrganizationMember>, TenancyError> {
            unimplemented!()
        }
        async fn update_member_role(&self, _o: Uuid, _u: Uuid, _r: Role) -> Result<(), TenancyError> {
            unimplemented!()
        }
        async fn delete_member(&self, _o: Uuid, _u: Uuid) -> Result<(), TenancyError> {
            unimplemented!()
        }
        async fn insert_project(&self, _p: &Project) -> Result<(), TenancyError> {
            unimplemented!()
        }
        async fn find_project(&self, _id: Uuid) -> Result<Option<Project>, TenancyError> {
            unimplemented!()
        }
        async fn find_project_by_slug(&self, _o: Uuid, _s: &str) -> Result<Option<Project>, TenancyError> {
            unimplemented!()
        }
        async fn find_project_by_public_key(&self, public_key: &str) -> Result<Option<Project>, TenancyError> {
            Ok(if self.project.public_key == public_key { Some(self.project.clone()) } else { None })
        }
        async fn update_project(&self, _p: &Project) -> Result<(), TenancyError> {
            unimplemented!()
        }
        async fn delete_project(&self, _id: Uuid) -> Result<(), TenancyError> {
            unimplemented!()
        }
        async fn list_projects(&self, _o: Uuid) -> Result<Vec<Project>, TenancyError> {
            unimplemented!()
        }
    }

    struct InMemoryIngest {
        issues_by_fingerprint: Mutex<HashMap<(Uuid, String), Issue>>,
        events_by_id: Mutex<HashMap<(Uuid, Uuid), EventRecord>>,
    }

    impl InMemoryIngest {
        fn new() -> Self {
            Self { issues_by_fingerprint: Mutex::new(HashMap::new()), events_by_id: Mutex::new(HashMap::new()) }
        }
    }

    #[async_trait]
    impl IngestRepository for InMemoryIngest {
        async fn find_issue_by_fingerprint(&self, project_id: Uuid, fingerprint: &str) -> Result<Option<Issue>, IngestError> {
            Ok(self.issues_by_fingerprint.lock().expect("lock").get(&(project_id, fingerprint.to_string())).cloned())
        }

        async fn find_event(&self, project_id: Uuid, event_id: Uuid) -> Result<Option<EventRecord>, IngestError> {
            Ok(self.events_by_id.lock().expect("lock").get(&(project_id, event_id)).cloned())
        }

        async fn insert_issue_and_event(&self, issue: &Issue, event: &EventRecord) -> Result<(), IngestError> {
            self.issues_by_fingerprint.lock().expect("lock").insert((issue.project_id, issue.fingerprint.clone()), issue.clone());
            self.events_by_id.lock().expect("lock").insert((event.project_id, event.event_id), event.clone());
            Ok(())
        }

        async fn bump_issue_and_insert_event(&self, issue: &Issue, event: &EventRecord) -> Result<(), IngestError> {
            self.issues_by_fingerprint.lock().expect("lock").insert((issue.project_id, issue.fingerprint.clone()), issue.clone());
            self.events_by_id.lock().expect("lock").insert((event.project_id, event.event_id), event.clone());
            Ok(())
        }
    }

    fn project() -> Project {
        let id = Uuid::new_v4();
        let public_key = dsn::generate_key();
        let now = chrono::Utc::now();
        Project {
            id,
            organization_id: Uuid::new_v4(),
            name: "Test Project".into(),
            slug: "test-project".into(),
            description: None,
            platform: Platform::Javascript,
            secret_key: dsn::generate_key(),
            dsn: dsn::build("vigil.example.com", &public_key, id),
            public_key,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn envelope_with_message(event_id: Option<String>) -> RawEnvelope {
        RawEnvelope { event_id, message: Some(normalize::RawMessage::Plain("boom".into())), ..Default::default() }
    }

    #[tokio::test]
    async fn first_event_creates_a_new_unresolved_issue() {
        let project = project();
        let credential = Credential::SentryAuthKey(project.public_key.clone());
        let tenancy = InMemoryTenancy { project: project.clone() };
        let repo = InMemoryIngest::new();
        let clock = FixedClock::new(chrono::Utc::now());

        let outcome = ingest(&tenancy, &repo, &clock, &credential, envelope_with_message(None), None, None)
            .await
            .expect("ingest");
        assert!(!outcome.already_ingested);
        assert_eq!(outcome.project_id, project.id);
    }

    #[tokio::test]
    async fn second_event_with_same_fingerprint_bumps_the_same_issue() {
        let project = project();
        let credential = Credential::SentryAuthKey(project.public_key.clone());
        let tenancy = InMemoryTenancy { project: project.clone() };
        let repo = InMemoryIngest::new();
        let clock = FixedClock::new(chrono::Utc::now());

        let first = ingest(&tenancy, &repo, &clock, &credential, envelope_with_message(None), None, None)
            .await
            .expect("ingest");
        let second = ingest(&tenancy, &repo, &clock, &credential, envelope_with_message(None), None, None)
            .await
            .expect("ingest");

        assert_eq!(first.issue_id, second.issue_id);
        let issue = repo
            .issues_by_fingerprint
            .lock()
            .expect("lock")
            .values()
            .find(|i| i.id == first.issue_id)
            .cloned()
            .expect("issue exists");
        assert_eq!(issue.times_seen, 2);
    }

    #[tokio::test]
    async fn duplicate_event_id_is_reported_without_bumping_stats() {
        let project = project();
        let credential = Credential::SentryAuthKey(project.public_key.clone());
        let tenancy = InMemoryTenancy { project: project.clone() };
        let repo = InMemoryIngest::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let event_id = Uuid::new_v4().to_string();

        let first = ingest(&tenancy, &repo, &clock, &credential, envelope_with_message(Some(event_id.clone())), None, None)
            .await
            .expect("ingest");
        let second = ingest(&tenancy, &repo, &clock, &credential, envelope_with_message(Some(event_id)), None, None)
            .await
            .expect("ingest");

        assert!(!first.already_ingested);
        assert!(second.already_ingested);
        assert_eq!(first.internal_id, second.internal_id);
    }

    #[tokio::test]
    async fn inactive_project_rejects_ingestion() {
        let mut project = project();
        project.active = false;
        let credential = Credential::SentryAuthKey(project.public_key.clone());
        let tenancy = InMemoryTenancy { project };
        let repo = InMemoryIngest::new();
        let clock = FixedClock::new(chrono::Utc::now());

        let err = ingest(&tenancy, &repo, &clock, &credential, envelope_with_message(None), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Forbidden(_)));
    }

    #[tokio::test]
    async fn unknown_credential_is_unauthenticated() {
        let project = project();
        let credential = Credential::SentryAuthKey("not-the-real-key-aaaaaaaaaaaaaaa".into());
        let tenancy = InMemoryTenancy { project };
        let repo = InMemoryIngest::new();
        let clock = FixedClock::new(chrono::Utc::now());

        let err = ingest(&tenancy, &repo, &clock, &credential, envelope_with_message(None), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Unauthenticated(_)));
    }

    #[test]
    fn title_prefers_exception_type_and_value_over_message() {
        let mut normalized = minimal_normalized();
        normalized.exception_type = Some("TypeError".into());
        normalized.exception_value = Some("x is not a function".into());
        normalized.message = Some("ignored".into());
        assert_eq!(derive_title(&normalized), "TypeError: x is not a function");
    }

    #[test]
    fn title_falls_back_to_unknown_error() {
        let normalized = minimal_normalized();
        assert_eq!(derive_title(&normalized), UNKNOWN_ERROR_TITLE);
    }

    #[test]
    fn culprit_prefers_in_app_frames() {
        let frames = vec![
            StackFrame { function: Some("depFn".into()), filename: Some("node_modules/x/y.js".into()), module: None, in_app: false, lineno: Some(5) },
            StackFrame { function: Some("appFn".into()), filename: Some("src/app.js".into()), module: None, in_app: true, lineno: Some(10) },
        ];
        assert_eq!(derive_culprit(&frames), Some("appFn at app.js:10".to_string()));
    }

    fn minimal_normalized() -> NormalizedEvent {
        let value = RawExceptionValue { kind: None, value: None, module: None, mechanism: None, stacktrace: None };
        normalize::normalize(
            RawEnvelope { exception: Some(RawException { values: vec![value] }), ..Default::default() },
            None,
            None,
            &FixedClock::new(chrono::Utc::now()),
        )
        .expect("normalize")
    }
}
