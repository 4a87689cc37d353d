//! DSN generation and parsing (§4.4).
//!
//! A DSN has the form `https://{publicKey}@{host}/{projectId}`. A bare
//! 32-character hex token is also accepted as a short form that resolves a
//! project by `publicKey` alone, without pinning a specific `projectId`.

use rand::RngCore;
use uuid::Uuid;

use crate::error::TenancyError;

const KEY_LEN_BYTES: usize = 16;

/// Generate a fresh 32-character lowercase hex key (public or secret).
#[must_use]
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_LEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Build the canonical DSN string for a project.
#[must_use]
pub fn build(host: &str, public_key: &str, project_id: Uuid) -> String {
    format!("https://{public_key}@{host}/{project_id}")
}

fn is_hex_key(s: &str) -> bool {
    s.len() == KEY_LEN_BYTES * 2 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// A DSN resolved into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDsn {
    pub public_key: String,
    /// Present for a full DSN; absent for the bare-publicKey short form.
    pub project_id: Option<Uuid>,
}

/// Parse a DSN (full `https://{key}@{host}/{id}` or bare 32-hex key).
///
/// # Errors
/// Returns [`TenancyError::InvalidDsn`] when the input is neither a valid
/// bare key nor a well-formed DSN (wrong scheme, missing/invalid userinfo,
/// missing host, or a path that doesn't parse as a project id).
pub fn parse(input: &str) -> Result<ParsedDsn, TenancyError> {
    let trimmed = input.trim();
    if is_hex_key(trimmed) {
        return Ok(ParsedDsn {
            public_key: trimmed.to_lowercase(),
            project_id: None,
        });
    }

    let url = url::Url::parse(trimmed)
        .map_err(|e| TenancyError::InvalidDsn(format!("not a URL: {e}")))?;

    if url.scheme() != "https" {
        return Err(TenancyError::InvalidDsn("scheme must be https".to_string()));
    }
    let public_key = url.username();
    if public_key.is_empty() || !is_hex_key(public_key) {
        return Err(TenancyError::InvalidDsn(
            "missing or malformed public key".to_string(),
        ));
    }
    if url.host_str().is_none() {
        return Err(TenancyError::InvalidDsn("missing host".to_string()));
    }
    let project_id = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TenancyError::InvalidDsn("missing project id in path".to_string()))?;
    let project_id = Uuid::parse_str(project_id)
        .map_err(|_| TenancyError::InvalidDsn("project id is not a valid UUID".to_string()))?;

    Ok(ParsedDsn {
        public_key: public_key.to_lowercase(),
        project_id: Some(project_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_is_32_lowercase_hex_chars() {
        let key = generate_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn parses_full_dsn() {
        let id = Uuid::new_v4();
        let key = generate_key();
        let dsn = build("errors.example.com", &key, id);
        let parsed = parse(&dsn).unwrap();
        assert_eq!(parsed.public_key, key);
        assert_eq!(parsed.project_id, Some(id));
    }

    #[test]
    fn parses_bare_public_key_short_form() {
        let key = generate_key();
        let parsed = parse(&key).unwrap();
        assert_eq!(parsed.public_key, key);
        assert_eq!(parsed.project_id, None);
    }

    #[test]
    fn rejects_non_https_scheme() {
        let id = Uuid::new_v4();
        let key = generate_key();
        let dsn = format!("http://{key}@host/{id}");
        assert!(parse(&dsn).is_err());
    }

    #[test]
    fn rejects_missing_public_key() {
        let id = Uuid::new_v4();
        let dsn = format!("https://host/{id}");
        assert!(parse(&dsn).is_err());
    }

    #[test]
    fn rejects_non_uuid_path() {
        let key = generate_key();
        let dsn = format!("https://{key}@host/not-a-uuid");
        assert!(parse(&dsn).is_err());
    }
}
