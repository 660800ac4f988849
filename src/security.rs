//! Security helpers: room codes, password hashing, token digests.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

/// Room codes are 8 characters drawn from A-Z and 0-9.
pub const ROOM_CODE_LEN: usize = 8;
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a room code. Uniqueness is checked against the store by the
/// caller; collisions are retried there.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Argon2 hash for user account and room passwords.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::HashError(e.to_string()))
}

/// Verify a plaintext password against a stored argon2 hash.
/// An unparseable hash verifies as false rather than erroring.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hex digest of a token, used as the blacklist cache key so raw JWTs are
/// never written to Redis.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_code_shape() {
        let code = generate_room_code();
        assert_eq!(code.len(), ROOM_CODE_LEN);
        assert!(code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }

    #[test]
    fn room_codes_vary() {
        let a = generate_room_code();
        let b = generate_room_code();
        // 36^-8 collision odds; equal draws here mean a broken generator.
        assert_ne!(a, b);
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("abcd").expect("hashing should succeed");
        assert_ne!(hash, "abcd");
        assert!(verify_password(&hash, "abcd"));
        assert!(!verify_password(&hash, "wrong"));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "abcd"));
    }

    #[test]
    fn token_digest_is_stable_hex() {
        let d1 = token_digest("some.jwt.token");
        let d2 = token_digest("some.jwt.token");
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 64);
        assert_ne!(d1, token_digest("other.jwt.token"));
    }
}
