//! Credential hashing.
//!
//! Passwords are stored as Argon2id PHC strings. The domain layer only
//! ever sees the hash and the `verify` result; plaintext credentials stay
//! inside the transport request that carried them.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to hash credential")]
    HashFailed,

    #[error("Stored credential hash is malformed")]
    MalformedHash,
}

/// Hash a plaintext credential into a PHC-format string.
pub fn hash(plaintext: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| CredentialError::HashFailed)
}

/// Verify a plaintext credential against a stored PHC string.
pub fn verify(stored_hash: &str, plaintext: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| CredentialError::MalformedHash)?;
    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let h = hash("hunter2").unwrap();
        assert!(verify(&h, "hunter2").unwrap());
        assert!(!verify(&h, "hunter3").unwrap());
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(verify("not-a-phc-string", "pw").is_err());
    }
}
