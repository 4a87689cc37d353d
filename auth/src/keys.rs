//! Ed25519 keypair handling for EdDSA-signed access/refresh tokens.
//!
//! Mirrors the PEM round-trip used for asymmetric JWT signing: a private key
//! is loaded or generated, then both the encoding and decoding halves are
//! derived from it so a single `Keypair` can issue and verify its own tokens.

use ed25519_dalek::pkcs8::{
    spki::der::pem::LineEnding, DecodePrivateKey, EncodePrivateKey, EncodePublicKey,
};
use ed25519_dalek::SigningKey;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::rngs::OsRng;

use crate::error::AuthError;

pub struct Keypair {
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
}

impl Keypair {
    /// Generate a fresh keypair. Used for tests and first-run bootstrap.
    pub fn generate() -> Result<Self, AuthError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(&signing_key)
    }

    /// Load a keypair from a PKCS#8 PEM-encoded Ed25519 private key.
    pub fn from_private_pem(pem: &str) -> Result<Self, AuthError> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| AuthError::Internal(format!("invalid Ed25519 private key: {e}")))?;
        Self::from_signing_key(&signing_key)
    }

    fn from_signing_key(signing_key: &SigningKey) -> Result<Self, AuthError> {
        let private_pem = signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::Internal(format!("failed to encode signing key: {e}")))?;
        let public_pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::Internal(format!("failed to encode verifying key: {e}")))?;
        let encoding_key = EncodingKey::from_ed_pem(private_pem.as_bytes())
            .map_err(|e| AuthError::Internal(format!("invalid EdDSA private PEM: {e}")))?;
        let decoding_key = DecodingKey::from_ed_pem(public_pem.as_bytes())
            .map_err(|e| AuthError::Internal(format!("invalid EdDSA public PEM: {e}")))?;
        Ok(Self { encoding_key, decoding_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keypair_can_be_constructed() {
        assert!(Keypair::generate().is_ok());
    }
}
