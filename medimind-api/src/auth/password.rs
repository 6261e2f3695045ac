//! Password hashing (PBKDF2-HMAC-SHA256)
//!
//! Hashes are PHC strings: `$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`

use pbkdf2::password_hash::{
    self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use pbkdf2::{Algorithm, Params, Pbkdf2};
use rand::RngCore;

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

/// Hasher with a fixed iteration count
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    rounds: u32,
}

impl PasswordHasher {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    /// Hash with a fresh random salt
    pub fn hash_password(&self, password: &str) -> Result<String, password_hash::Error> {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)?;

        let params = Params {
            rounds: self.rounds,
            output_length: HASH_LENGTH,
        };
        let hash = Pbkdf2.hash_password_customized(
            password.as_bytes(),
            Some(Algorithm::Pbkdf2Sha256.ident()),
            None,
            params,
            &salt,
        )?;

        Ok(hash.to_string())
    }

    /// Check a password against a stored hash; malformed hashes never verify
    ///
    /// The stored iteration count is used, so hashes survive a change of
    /// the configured rounds.
    pub fn verify_password(&self, password: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low iteration count keeps the tests fast
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hasher().hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$pbkdf2-sha256$"));
        assert!(hash.contains("i=1000"));
        assert!(hasher().verify_password("correct horse", &hash));
        assert!(!hasher().verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_salt_is_random() {
        let a = hasher().hash_password("same").unwrap();
        let b = hasher().hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(hasher().verify_password("same", &a));
        assert!(hasher().verify_password("same", &b));
    }

    #[test]
    fn test_verify_uses_stored_rounds() {
        let hash = PasswordHasher::new(500).hash_password("pw").unwrap();
        assert!(PasswordHasher::new(2_000).verify_password("pw", &hash));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        for stored in [
            "",
            "plaintext",
            "$2b$12$abcdefghijklmnopqrstuv",
            "$pbkdf2-sha256$i=abc$c2FsdA$aGFzaA",
            "$pbkdf2-sha256$i=10$!!!$aGFzaA",
            "$pbkdf2-sha256$i=10$c2FsdA$aGFzaA$extra",
            "$argon2id$v=19$m=16,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g",
        ] {
            assert!(!hasher().verify_password("pw", stored), "{:?}", stored);
        }
    }

    #[test]
    fn test_tampered_hash_does_not_verify() {
        let hash = hasher().hash_password("pw").unwrap();
        let (head, digest) = hash.rsplit_once('$').unwrap();
        let flipped = if digest.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{}${}{}", head, flipped, &digest[1..]);
        assert!(!hasher().verify_password("pw", &tampered));
    }

    #[test]
    fn test_long_passwords_are_not_truncated() {
        let long_a = "a".repeat(100);
        let long_b = format!("{}b", "a".repeat(99));
        let hash = hasher().hash_password(&long_a).unwrap();
        assert!(!hasher().verify_password(&long_b, &hash));
    }
}
