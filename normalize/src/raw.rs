//! Wire-format types for the Sentry-compatible envelope (§6.1).
//!
//! Deserialization is permissive: unknown keys are ignored (the default
//! `serde` behavior), and every field the spec documents as optional is
//! `Option`-wrapped so a minimal `{"message": "..."}` body still parses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Top-level event envelope as submitted by an SDK.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEnvelope {
    pub event_id: Option<String>,
    pub timestamp: Option<String>,
    pub level: Option<String>,
    pub logger: Option<String>,
    pub platform: Option<String>,
    pub release: Option<String>,
    pub environment: Option<String>,
    pub server_name: Option<String>,
    pub message: Option<RawMessage>,
    pub exception: Option<RawException>,
    pub user: Option<RawUser>,
    pub request: Option<RawRequest>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub extra: serde_json::Map<String, Value>,
    #[serde(default)]
    pub breadcrumbs: Vec<Value>,
    #[serde(default)]
    pub contexts: serde_json::Map<String, Value>,
    pub fingerprint: Option<Vec<String>>,
    #[serde(default)]
    pub modules: serde_json::Map<String, Value>,
}

/// `message` may be a plain string (rare clients) or the structured object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawMessage {
    Plain(String),
    Structured {
        message: Option<String>,
        #[serde(default)]
        params: Vec<Value>,
        formatted: Option<String>,
    },
}

impl RawMessage {
    /// Reduce to a single string, preferring `formatted` over `message`.
    #[must_use]
    pub fn reduce(&self) -> Option<String> {
        match self {
            Self::Plain(s) => Some(s.clone()),
            Self::Structured {
                message, formatted, ..
            } => formatted.clone().or_else(|| message.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawException {
    #[serde(default)]
    pub values: Vec<RawExceptionValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawExceptionValue {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<String>,
    pub module: Option<String>,
    #[serde(default)]
    pub mechanism: Option<Value>,
    pub stacktrace: Option<RawStacktrace>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStacktrace {
    #[serde(default)]
    pub frames: Vec<RawFrame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    pub filename: Option<String>,
    pub function: Option<String>,
    pub module: Option<String>,
    pub lineno: Option<u32>,
    pub colno: Option<u32>,
    pub abs_path: Option<String>,
    pub context_line: Option<String>,
    #[serde(default)]
    pub pre_context: Vec<String>,
    #[serde(default)]
    pub post_context: Vec<String>,
    pub in_app: Option<bool>,
    pub package: Option<String>,
    pub platform: Option<String>,
    pub instruction_addr: Option<String>,
    pub symbol: Option<String>,
    pub symbol_addr: Option<String>,
    pub image_addr: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawUser {
    pub id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRequest {
    pub url: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub data: Value,
    pub query_string: Option<String>,
    #[serde(default)]
    pub headers: serde_json::Map<String, Value>,
    #[serde(default)]
    pub env: serde_json::Map<String, Value>,
    #[serde(default)]
    pub cookies: Value,
}
