//! # Vigil Fingerprint
//!
//! Derives a stable grouping hash from a normalized event, so that events
//! which are "the same bug" — modulo dynamic substrings, frame reordering,
//! and cache-busting filename suffixes — land on the same [`Issue`].
//!
//! Pure: given identical input this always produces identical output. No
//! I/O, no clock access — every call is computed from the arguments alone.
//!
//! [`Issue`]: https://docs.rs/vigil-issues

#![forbid(unsafe_code)]

mod frame;
mod message;

pub use frame::{frame_signature, normalize_filename, normalize_function, select_frames, StackFrame};
pub use message::normalize_message;

use sha2::{Digest, Sha256};

/// The literal client directive meaning "use the default algorithm".
pub const DEFAULT_DIRECTIVE: &str = "{{ default }}";

/// Everything the fingerprint engine needs from a normalized event.
#[derive(Debug, Clone, Default)]
pub struct FingerprintInput {
    /// SDK platform tag (e.g. `javascript`, `python`).
    pub platform: String,
    /// Exception type name, if the event carried an exception.
    pub error_type: Option<String>,
    /// The reduced message or exception value used for grouping.
    pub message: String,
    /// Stack frames, in original (innermost-first) order.
    pub frames: Vec<StackFrame>,
    /// Transaction/route name, used only for the `{{ transaction }}` directive.
    pub transaction: Option<String>,
    /// Client-supplied fingerprint directive, if any.
    pub directive: Option<Vec<String>>,
}

fn substitute_directive_entry(entry: &str, input: &FingerprintInput) -> String {
    match entry {
        "{{ error.type }}" => input.error_type.clone().unwrap_or_default(),
        "{{ error.value }}" => input.message.clone(),
        "{{ transaction }}" => input.transaction.clone().unwrap_or_default(),
        literal => literal.to_string(),
    }
}

fn is_default_directive(directive: &[String]) -> bool {
    directive.len() == 1 && directive[0] == DEFAULT_DIRECTIVE
}

/// Compute the stable hex digest identifying `input`'s equivalence class.
#[must_use]
pub fn compute(input: &FingerprintInput) -> String {
    let basis = match &input.directive {
        Some(directive) if !directive.is_empty() && !is_default_directive(directive) => directive
            .iter()
            .map(|entry| substitute_directive_entry(entry, input))
            .collect::<Vec<_>>()
            .join("||"),
        _ => default_basis(input),
    };
    let mut hasher = Sha256::new();
    hasher.update(basis.as_bytes());
    hex::encode(hasher.finalize())
}

fn default_basis(input: &FingerprintInput) -> String {
    let error_type = input.error_type.clone().unwrap_or_default();
    let message = normalize_message(&input.message);
    let primary_filename = input
        .frames
        .first()
        .and_then(|f| f.filename.as_deref())
        .map(normalize_filename)
        .unwrap_or_default();

    let selected = select_frames(&input.frames);
    let mut signatures: Vec<String> = selected.iter().map(|f| frame_signature(f)).collect();
    signatures.sort();

    format!(
        "platform:{}||type:{}||message:{}||file:{}||stack:{}",
        input.platform,
        error_type,
        message,
        primary_filename,
        signatures.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(function: &str, filename: &str, in_app: bool) -> StackFrame {
        StackFrame {
            function: Some(function.to_string()),
            filename: Some(filename.to_string()),
            module: None,
            in_app,
            lineno: Some(42),
        }
    }

    #[test]
    fn identical_inputs_produce_identical_hash() {
        let input = FingerprintInput {
            platform: "javascript".into(),
            error_type: Some("TypeError".into()),
            message: "Cannot read property 'x' of undefined".into(),
            frames: vec![frame("handleClick", "app.js", true)],
            transaction: None,
            directive: None,
        };
        assert_eq!(compute(&input), compute(&input));
    }

    #[test]
    fn frame_reorder_groups_together() {
        let mut input = FingerprintInput {
            platform: "javascript".into(),
            error_type: Some("TypeError".into()),
            message: "boom".into(),
            frames: vec![frame("a", "a.js", true), frame("b", "b.js", true)],
            transaction: None,
            directive: None,
        };
        let h1 = compute(&input);
        input.frames.reverse();
        let h2 = compute(&input);
        assert_eq!(h1, h2);
    }

    #[test]
    fn dynamic_message_substrings_group_together() {
        let mk = |value: &str| FingerprintInput {
            platform: "python".into(),
            error_type: Some("ReferenceError".into()),
            message: value.into(),
            frames: vec![],
            transaction: None,
            directive: None,
        };
        let a = compute(&mk(
            "user 12345 not found at /v1/orders/9f0c4b9e-7b6d-4f23-9c7a-aee5a5f9e8a9 :10:3",
        ));
        let b = compute(&mk(
            "user 98765 not found at /v1/orders/11111111-2222-3333-4444-555555555555 :22:1",
        ));
        assert_eq!(a, b);
    }

    #[test]
    fn default_directive_equals_no_directive() {
        let mut input = FingerprintInput {
            platform: "javascript".into(),
            error_type: Some("Error".into()),
            message: "boom".into(),
            frames: vec![],
            transaction: None,
            directive: None,
        };
        let without = compute(&input);
        input.directive = Some(vec![DEFAULT_DIRECTIVE.to_string()]);
        let with_default = compute(&input);
        assert_eq!(without, with_default);
    }

    #[test]
    fn explicit_directive_overrides_default_grouping() {
        let input_a = FingerprintInput {
            platform: "javascript".into(),
            error_type: Some("Error".into()),
            message: "boom one".into(),
            frames: vec![frame("a", "a.js", true)],
            transaction: Some("checkout".into()),
            directive: Some(vec!["{{ transaction }}".to_string()]),
        };
        let input_b = FingerprintInput {
            message: "boom two".into(),
            frames: vec![frame("b", "b.js", true)],
            ..input_a.clone()
        };
        assert_eq!(compute(&input_a), compute(&input_b));
    }

    #[test]
    fn literal_directive_entries_are_used_verbatim() {
        let input = FingerprintInput {
            platform: "javascript".into(),
            error_type: None,
            message: String::new(),
            frames: vec![],
            transaction: None,
            directive: Some(vec!["checkout-failure".to_string()]),
        };
        let other = FingerprintInput {
            directive: Some(vec!["other-bucket".to_string()]),
            ..input.clone()
        };
        assert_ne!(compute(&input), compute(&other));
    }

    #[test]
    fn hash_is_lowercase_hex_sha256_length() {
        let input = FingerprintInput {
            platform: "go".into(),
            error_type: None,
            message: "x".into(),
            frames: vec![],
            transaction: None,
            directive: None,
        };
        let h = compute(&input);
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
