//! Password hashing for account credentials.
//!
//! Stored format: `salt$digest`, where digest = hex(SHA-256(prefix || salt || password)).
//! Verification compares digests in constant time so a login probe cannot
//! distinguish "wrong password" from "no such user" by timing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Domain separation prefix so these digests can never collide with other
/// SHA-256 uses in the system.
const HASH_PREFIX: &[u8] = b"scamdex-pw-v1:";

const SALT_LEN: usize = 16;

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(HASH_PREFIX);
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    use rand::RngCore;
    use rand::rngs::OsRng;

    let mut salt_bytes = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);
    format!("{}${}", salt, digest(&salt, password))
}

/// Generate a 6-digit verification code for an OTP session. Only the hash
/// is persisted; the plaintext goes straight to the delivery provider.
pub fn generate_otp_code() -> String {
    use rand::Rng;

    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

/// Verify a password against a stored `salt$digest` hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let computed = digest(salt, password);
    // Both sides are fixed-length hex, so the length check never short-circuits.
    computed.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_stored_hash_rejects() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
    }

    #[test]
    fn otp_codes_are_six_digits() {
        for _ in 0..32 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
