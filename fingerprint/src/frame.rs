//! Stack-frame normalization and signature derivation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One stack-trace frame, reduced to the fields the fingerprint engine reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackFrame {
    /// Function or method name, if known.
    pub function: Option<String>,
    /// Source file or module path, if known.
    pub filename: Option<String>,
    /// Logical module name, if known (distinct from the file path).
    pub module: Option<String>,
    /// Whether the SDK marked this frame as belonging to the instrumented
    /// application rather than a dependency.
    pub in_app: bool,
    /// Line number, used to derive a culprit string (not part of the hash).
    pub lineno: Option<u32>,
}

static ANONYMOUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(anonymous|<anonymous>|Object\.<anonymous>)$").expect("valid regex")
});
static ARROW_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"=>|\(anonymous function\)").expect("valid regex"));
static BOUND_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^bound\s+").expect("valid regex"));
static WEBPACK_REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__webpack_require__(\.\w+)?").expect("valid regex"));

/// Normalize a function name so semantically identical frames produced by
/// different bundlers/minifiers collapse to the same signature.
#[must_use]
pub fn normalize_function(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || ANONYMOUS.is_match(trimmed) {
        return "<anonymous>".to_string();
    }
    let s = BOUND_PREFIX.replace(trimmed, "");
    let s = WEBPACK_REQUIRE.replace_all(&s, "<webpack>");
    let s = ARROW_MARKER.replace_all(&s, "<arrow>");
    s.trim().to_string()
}

static QUERY_OR_FRAGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?#].*$").expect("valid regex"));
static CONTENT_HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[0-9a-fA-F]{8,}(?=\.\w+$)").expect("valid regex"));
static SOURCE_MAP_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.map$").expect("valid regex"));
/// Normalize a filename/path so cache-busting hashes, source-map suffixes,
/// and absolute dependency-tree prefixes don't split an otherwise-identical
/// frame into a new group.
#[must_use]
pub fn normalize_filename(raw: &str) -> String {
    let s = QUERY_OR_FRAGMENT.replace(raw, "");
    let s = SOURCE_MAP_SUFFIX.replace(&s, "");
    let s = CONTENT_HASH.replace(&s, "");
    if let Some(idx) = s.find("node_modules/") {
        s[idx..].to_string()
    } else {
        s.into_owned()
    }
}

/// Build the `func:...|file:...|module:...` signature for one frame,
/// omitting any component that's empty.
#[must_use]
pub fn frame_signature(frame: &StackFrame) -> String {
    let mut parts = Vec::with_capacity(3);
    if let Some(f) = &frame.function {
        let norm = normalize_function(f);
        if !norm.is_empty() {
            parts.push(format!("func:{norm}"));
        }
    }
    if let Some(f) = &frame.filename {
        let norm = normalize_filename(f);
        if !norm.is_empty() {
            parts.push(format!("file:{norm}"));
        }
    }
    if let Some(m) = &frame.module {
        if !m.is_empty() {
            parts.push(format!("module:{m}"));
        }
    }
    parts.join("|")
}

/// Select up to 5 frames for hashing, preferring in-app frames first, in
/// their original relative order.
#[must_use]
pub fn select_frames(frames: &[StackFrame]) -> Vec<&StackFrame> {
    let mut in_app: Vec<&StackFrame> = frames.iter().filter(|f| f.in_app).collect();
    let mut rest: Vec<&StackFrame> = frames.iter().filter(|f| !f.in_app).collect();
    in_app.append(&mut rest);
    in_app.truncate(5);
    in_app
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_variants_collapse() {
        assert_eq!(normalize_function("anonymous"), "<anonymous>");
        assert_eq!(normalize_function("<anonymous>"), "<anonymous>");
        assert_eq!(normalize_function(""), "<anonymous>");
    }

    #[test]
    fn bound_prefix_is_stripped() {
        assert_eq!(normalize_function("bound handleClick"), "handleClick");
    }

    #[test]
    fn webpack_require_is_masked() {
        assert_eq!(
            normalize_function("__webpack_require__.t"),
            "<webpack>"
        );
    }

    #[test]
    fn filename_strips_query_and_content_hash() {
        assert_eq!(
            normalize_filename("/static/js/main.a1b2c3d4.js?foo=bar#frag"),
            "/static/js/main.js"
        );
    }

    #[test]
    fn filename_strips_source_map_suffix() {
        assert_eq!(normalize_filename("bundle.js.map"), "bundle.js");
    }

    #[test]
    fn filename_canonicalizes_node_modules_prefix() {
        assert_eq!(
            normalize_filename("/home/build/app/node_modules/lodash/index.js"),
            "node_modules/lodash/index.js"
        );
    }

    #[test]
    fn select_frames_prefers_in_app_and_caps_at_five() {
        let frames: Vec<StackFrame> = (0..8)
            .map(|i| StackFrame {
                function: Some(format!("f{i}")),
                filename: None,
                module: None,
                in_app: i % 2 == 0,
                lineno: None,
            })
            .collect();
        let selected = select_frames(&frames);
        assert_eq!(selected.len(), 5);
        assert!(selected[0].in_app);
    }
}
