//! # Vigil Normalize
//!
//! Reduces a raw, heterogeneous Sentry-compatible envelope (§4.2) into a
//! [`NormalizedEvent`] with every defaultable field filled in and every
//! required field validated. Produces the input the `fingerprint` crate
//! needs, without depending on persistence or the clock beyond what's
//! injected.

#![forbid(unsafe_code)]

mod error;
mod raw;

pub use error::NormalizeError;
pub use raw::{RawEnvelope, RawException, RawExceptionValue, RawFrame, RawMessage, RawRequest, RawStacktrace, RawUser};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use vigil_core::Clock;
use vigil_fingerprint::{FingerprintInput, StackFrame};

/// Severity, lowercased and restricted to the set the spec recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        })
    }
}

impl FromStr for Level {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "fatal" | "critical" => Ok(Self::Fatal),
            other => Err(NormalizeError::InvalidLevel(other.to_string())),
        }
    }
}

const DEFAULT_PLATFORM: &str = "javascript";
const DEFAULT_ENVIRONMENT: &str = "production";

/// The canonical, fully-defaulted shape of an ingested event.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub platform: String,
    pub environment: String,
    pub release: Option<String>,
    pub server_name: Option<String>,
    pub logger: Option<String>,
    pub message: Option<String>,
    pub exception_type: Option<String>,
    pub exception_value: Option<String>,
    pub exception_module: Option<String>,
    pub stack_trace: Vec<StackFrame>,
    pub tags: BTreeMap<String, String>,
    pub extra: serde_json::Map<String, serde_json::Value>,
    pub user_context: Option<serde_json::Value>,
    pub request_context: Option<serde_json::Value>,
    pub fingerprint_directive: Option<Vec<String>>,
}

impl NormalizedEvent {
    /// Project this event onto the subset the grouping engine reads.
    #[must_use]
    pub fn fingerprint_input(&self) -> FingerprintInput {
        let message = self
            .exception_value
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_default();
        FingerprintInput {
            platform: self.platform.clone(),
            error_type: self.exception_type.clone(),
            message,
            frames: self.stack_trace.clone(),
            transaction: self.tags.get("transaction").cloned(),
            directive: self.fingerprint_directive.clone(),
        }
    }
}

fn reduce_frame(raw: &RawFrame) -> StackFrame {
    StackFrame {
        function: raw.function.clone(),
        filename: raw.filename.clone().or_else(|| raw.abs_path.clone()),
        module: raw.module.clone(),
        in_app: raw.in_app.unwrap_or(false),
        lineno: raw.lineno,
    }
}

/// Reduce a raw envelope into a [`NormalizedEvent`], applying every default
/// from §4.2's table and rejecting events that fail the required-content
/// checks.
///
/// `client_ip`/`user_agent` come from the HTTP transport layer, not the
/// envelope body, and are merged into `tags` under `client_ip`/`user_agent`
/// so they survive into issue/event storage like any other tag.
pub fn normalize(
    raw: RawEnvelope,
    client_ip: Option<String>,
    user_agent: Option<String>,
    clock: &dyn Clock,
) -> Result<NormalizedEvent, NormalizeError> {
    let message = raw.message.as_ref().and_then(RawMessage::reduce);
    let exception_values = raw.exception.as_ref().map(|e| e.values.as_slice());

    if message.is_none() && exception_values.map_or(true, <[RawExceptionValue]>::is_empty) {
        if matches!(exception_values, Some(values) if values.is_empty()) {
            return Err(NormalizeError::EmptyExceptionValues);
        }
        return Err(NormalizeError::MissingContent);
    }

    let level = match raw.level.as_deref() {
        Some(raw_level) => raw_level.parse()?,
        None => Level::Error,
    };

    let event_id = raw
        .event_id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let timestamp = raw
        .timestamp
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| clock.now());

    let primary_exception = exception_values.and_then(<[RawExceptionValue]>::first);
    let exception_type = primary_exception.and_then(|v| v.kind.clone());
    let exception_value = primary_exception.and_then(|v| v.value.clone());
    let exception_module = primary_exception.and_then(|v| v.module.clone());
    let stack_trace = primary_exception
        .and_then(|v| v.stacktrace.as_ref())
        .map(|st| st.frames.iter().map(reduce_frame).collect())
        .unwrap_or_default();

    let mut tags = raw.tags.clone();
    if let Some(ip) = client_ip {
        tags.insert("client_ip".to_string(), ip);
    }
    if let Some(ua) = user_agent {
        tags.insert("user_agent".to_string(), ua);
    }

    let user_context = raw
        .user
        .as_ref()
        .map(|u| serde_json::to_value(u).unwrap_or(serde_json::Value::Null));
    let request_context = raw
        .request
        .as_ref()
        .map(|r| serde_json::to_value(r).unwrap_or(serde_json::Value::Null));

    Ok(NormalizedEvent {
        event_id,
        timestamp,
        level,
        platform: raw.platform.unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
        environment: raw
            .environment
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
        release: raw.release,
        server_name: raw.server_name,
        logger: raw.logger,
        message,
        exception_type,
        exception_value,
        exception_module,
        stack_trace,
        tags,
        extra: raw.extra,
        user_context,
        request_context,
        fingerprint_directive: raw.fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::FixedClock;

    fn clock() -> FixedClock {
        FixedClock::new(DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc))
    }

    fn minimal_envelope(body: &str) -> RawEnvelope {
        serde_json::from_str(body).expect("valid envelope json")
    }

    #[test]
    fn rejects_event_with_neither_message_nor_exception() {
        let raw = minimal_envelope(r#"{"level": "error"}"#);
        let err = normalize(raw, None, None, &clock()).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingContent));
    }

    #[test]
    fn rejects_empty_exception_values() {
        let raw = minimal_envelope(r#"{"exception": {"values": []}}"#);
        let err = normalize(raw, None, None, &clock()).unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyExceptionValues));
    }

    #[test]
    fn rejects_invalid_level() {
        let raw = minimal_envelope(r#"{"message": "x", "level": "catastrophic"}"#);
        let err = normalize(raw, None, None, &clock()).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidLevel(_)));
    }

    #[test]
    fn applies_defaults_when_fields_absent() {
        let raw = minimal_envelope(r#"{"message": "boom"}"#);
        let event = normalize(raw, None, None, &clock()).unwrap();
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.platform, "javascript");
        assert_eq!(event.environment, "production");
        assert_eq!(event.timestamp, clock().now());
        assert!(event.tags.is_empty());
    }

    #[test]
    fn message_formatted_preferred_over_message_message() {
        let raw = minimal_envelope(
            r#"{"message": {"message": "raw %s", "formatted": "raw value", "params": ["value"]}}"#,
        );
        let event = normalize(raw, None, None, &clock()).unwrap();
        assert_eq!(event.message.as_deref(), Some("raw value"));
    }

    #[test]
    fn exception_reduction_takes_first_value() {
        let raw = minimal_envelope(
            r#"{"exception": {"values": [
                {"type": "TypeError", "value": "first"},
                {"type": "RangeError", "value": "second"}
            ]}}"#,
        );
        let event = normalize(raw, None, None, &clock()).unwrap();
        assert_eq!(event.exception_type.as_deref(), Some("TypeError"));
        assert_eq!(event.exception_value.as_deref(), Some("first"));
    }

    #[test]
    fn client_ip_and_user_agent_injected_into_tags() {
        let raw = minimal_envelope(r#"{"message": "boom"}"#);
        let event = normalize(
            raw,
            Some("203.0.113.5".to_string()),
            Some("curl/8.0".to_string()),
            &clock(),
        )
        .unwrap();
        assert_eq!(event.tags.get("client_ip").map(String::as_str), Some("203.0.113.5"));
        assert_eq!(event.tags.get("user_agent").map(String::as_str), Some("curl/8.0"));
    }

    #[test]
    fn level_is_lowercased_and_aliases_resolve() {
        let raw = minimal_envelope(r#"{"message": "boom", "level": "WARN"}"#);
        let event = normalize(raw, None, None, &clock()).unwrap();
        assert_eq!(event.level, Level::Warning);
        assert_eq!(event.level.to_string(), "warning");
    }

    #[test]
    fn renormalizing_a_fully_specified_envelope_is_idempotent() {
        let raw = minimal_envelope(
            r#"{
                "event_id": "11111111-2222-3333-4444-555555555555",
                "timestamp": "2025-06-01T12:00:00Z",
                "level": "fatal",
                "platform": "python",
                "environment": "staging",
                "message": "boom"
            }"#,
        );
        let first = normalize(raw.clone(), None, None, &clock()).unwrap();
        let second = normalize(raw, None, None, &clock()).unwrap();
        assert_eq!(first.event_id, second.event_id);
        assert_eq!(first.timestamp, second.timestamp);
        assert_eq!(first.level, second.level);
        assert_eq!(first.platform, second.platform);
        assert_eq!(first.environment, second.environment);
    }
}
