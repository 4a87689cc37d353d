//! Message normalization: replace dynamic substrings with stable
//! placeholders before hashing, so two events whose only difference is a
//! request id, a timestamp, or a line number still group together.

use once_cell::sync::Lazy;
use regex::Regex;

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").expect("valid regex"));
static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?")
        .expect("valid regex")
});
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid regex")
});
static MEM_ADDR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@0x[0-9a-fA-F]+").expect("valid regex"));
static HEX_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0x[0-9a-fA-F]+\b").expect("valid regex"));
static LINE_COL: Lazy<Regex> = Lazy::new(|| Regex::new(r":\d+:\d+\b").expect("valid regex"));
static IPV4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("valid regex"));
static OBJECT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[object \w+\]").expect("valid regex"));
static INDEX_ACCESSOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]").expect("valid regex"));
static NUMBER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4,}\b").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Replace dynamic substrings in a message with stable placeholders.
///
/// Order matters: wider patterns (timestamps, UUIDs) run before the
/// generic digit-run pattern so they aren't partially consumed by it.
#[must_use]
pub fn normalize_message(input: &str) -> String {
    let s = URL.replace_all(input, "<URL>");
    let s = EMAIL.replace_all(&s, "<EMAIL>");
    let s = TIMESTAMP.replace_all(&s, "<TIMESTAMP>");
    let s = UUID.replace_all(&s, "<UUID>");
    let s = MEM_ADDR.replace_all(&s, "@<ADDR>");
    let s = HEX_LITERAL.replace_all(&s, "<HEX_ID>");
    let s = LINE_COL.replace_all(&s, ":<LINE>:<COL>");
    let s = IPV4.replace_all(&s, "<IP>");
    let s = OBJECT_TAG.replace_all(&s, "[object <TYPE>]");
    let s = INDEX_ACCESSOR.replace_all(&s, "[<INDEX>]");
    let s = NUMBER_RUN.replace_all(&s, "<NUMBER>");
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_numbers_uuid_and_line_col() {
        let a = normalize_message(
            "user 12345 not found at /v1/orders/9f0c4b9e-7b6d-4f23-9c7a-aee5a5f9e8a9 :10:3",
        );
        let b = normalize_message(
            "user 67890 not found at /v1/orders/11111111-2222-3333-4444-555555555555 :22:1",
        );
        assert_eq!(a, b);
        assert!(a.contains("<NUMBER>"));
        assert!(a.contains("<UUID>"));
        assert!(a.contains(":<LINE>:<COL>"));
    }

    #[test]
    fn masks_url_email_ip_and_object_tag() {
        let s = normalize_message(
            "failed POST https://api.example.com/v1 from 203.0.113.5 for bob@example.com [object Window] items[3]",
        );
        assert!(s.contains("<URL>"));
        assert!(s.contains("<IP>"));
        assert!(s.contains("<EMAIL>"));
        assert!(s.contains("[object <TYPE>]"));
        assert!(s.contains("items[<INDEX>]"));
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_message("a   b\n\tc"), "a b c");
    }

    #[test]
    fn three_digit_numbers_survive() {
        // Only 4+ digit runs are masked.
        assert_eq!(normalize_message("HTTP 404 error"), "HTTP 404 error");
    }
}
