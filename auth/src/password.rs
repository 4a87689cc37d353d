//! Password hashing and strength validation.

use crate::error::AuthError;

const MIN_LENGTH: usize = 8;

/// Hash a plaintext password with bcrypt at the given cost factor.
pub fn hash(plain: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(plain, cost).map_err(|e| AuthError::Internal(format!("failed to hash password: {e}")))
}

/// Verify a plaintext password against a bcrypt hash.
///
/// Returns `InvalidCredentials` rather than propagating bcrypt's own error on a
/// malformed hash, so callers cannot distinguish "wrong password" from
/// "corrupt hash" through the error type.
pub fn verify(plain: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(plain, hash).or(Ok(false))
}

/// Reject passwords too weak to be worth hashing.
pub fn validate_strength(plain: &str) -> Result<(), AuthError> {
    if plain.chars().count() < MIN_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    let has_letter = plain.chars().any(|c| c.is_alphabetic());
    let has_digit = plain.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hashed = hash("correct-horse-9", 4).expect("hash should succeed");
        assert!(verify("correct-horse-9", &hashed).expect("verify should succeed"));
        assert!(!verify("wrong-password", &hashed).expect("verify should succeed"));
    }

    #[test]
    fn short_passwords_are_weak() {
        assert!(matches!(validate_strength("short1"), Err(AuthError::WeakPassword)));
    }

    #[test]
    fn passwords_without_a_digit_are_weak() {
        assert!(matches!(validate_strength("alllettersnodigits"), Err(AuthError::WeakPassword)));
    }

    #[test]
    fn strong_password_is_accepted() {
        assert!(validate_strength("correct-horse-9").is_ok());
    }

    #[test]
    fn verify_against_malformed_hash_reports_invalid_credentials_not_crash() {
        assert!(!verify("anything", "not-a-bcrypt-hash").expect("should not error"));
    }
}
