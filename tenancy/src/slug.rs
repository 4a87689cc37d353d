//! Slug normalization shared by organizations and projects (§4.4).

use crate::error::TenancyError;

const MAX_LEN: usize = 100;

/// Lowercase, trim, and validate a candidate slug.
///
/// # Errors
/// Returns [`TenancyError::Validation`] when the result is empty, exceeds
/// 100 characters, or contains characters outside `[a-z0-9_-]`.
pub fn normalize(raw: &str) -> Result<String, TenancyError> {
    let slug = raw.trim().to_lowercase();
    if slug.is_empty() {
        return Err(TenancyError::Validation("slug must not be empty".to_string()));
    }
    if slug.len() > MAX_LEN {
        return Err(TenancyError::Validation(format!(
            "slug must be at most {MAX_LEN} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TenancyError::Validation(
            "slug may only contain letters, digits, '-', and '_'".to_string(),
        ));
    }
    Ok(slug)
}
