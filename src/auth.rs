//! Registration and login with salted one-way credential hashing.
//!
//! Stored form is `salt_hex$digest_hex` where the digest is SHA-256
//! over salt followed by the password bytes. Plaintext never touches
//! the store and is never logged.

use crate::error::{ServiceError, ServiceResult};
use crate::store::{Database, UserRow};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::info;

const SALT_LEN: usize = 16;

#[derive(Clone)]
pub struct AuthService {
    db: Database,
}

impl AuthService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new user with zero balance. Duplicate emails fail with
    /// Conflict.
    pub fn register(&self, email: &str, password: &str) -> ServiceResult<UserRow> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "email and password required".to_string(),
            ));
        }

        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let stored = hash_password(&salt, password);

        let user = self.db.insert_user(email.trim(), &stored)?;
        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Verify credentials. Unknown email and digest mismatch are the
    /// same error so the response does not reveal which field was wrong.
    pub fn login(&self, email: &str, password: &str) -> ServiceResult<UserRow> {
        let user = self
            .db
            .get_user_by_email(email.trim())?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(&user.password_hash, password) {
            return Err(ServiceError::InvalidCredentials);
        }
        Ok(user)
    }
}

fn hash_password(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    format!("{}${}", hex::encode(salt), hex::encode(hasher.finalize()))
}

fn verify_password(stored: &str, password: &str) -> bool {
    let Some((salt_hex, _)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    hash_password(&salt, password) == stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Amount;

    fn setup() -> AuthService {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        AuthService::new(db)
    }

    #[test]
    fn test_register_and_login() {
        let auth = setup();

        let user = auth.register("alice@example.com", "hunter2").unwrap();
        assert_eq!(user.balance, Amount::ZERO);
        assert!(!user.password_hash.contains("hunter2"));

        let logged_in = auth.login("alice@example.com", "hunter2").unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[test]
    fn test_register_requires_fields() {
        let auth = setup();

        let err = auth.register("", "pw").unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        let err = auth.register("x@example.com", "").unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let auth = setup();

        auth.register("bob@example.com", "pw1").unwrap();
        let err = auth.register("bob@example.com", "pw2").unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[test]
    fn test_login_rejects_bad_credentials() {
        let auth = setup();
        auth.register("carol@example.com", "secret").unwrap();

        let err = auth.login("carol@example.com", "wrong").unwrap_err();
        assert_eq!(err.kind(), "invalid_credentials");
        let err = auth.login("nobody@example.com", "secret").unwrap_err();
        assert_eq!(err.kind(), "invalid_credentials");
    }

    #[test]
    fn test_same_password_different_salt() {
        let auth = setup();

        let a = auth.register("s1@example.com", "same").unwrap();
        let b = auth.register("s2@example.com", "same").unwrap();
        assert_ne!(a.password_hash, b.password_hash);
    }
}
