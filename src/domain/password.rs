//! Account password hashing and the password policy.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::config::MIN_PASSWORD_LENGTH;
use crate::errors::{AppError, AppResult};

/// Well-formed hash that never matches; verified against when an account is
/// missing so login does the same work on both paths.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$iWh06vD8Fy27wf9npn6FXWiCX4K6pW6Ue1Bnzz07Z8A";

/// Argon2id hash of an account password. Plain text never outlives `new`.
#[derive(Clone)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(..)")
    }
}

impl Password {
    /// Checks the policy, then hashes with a fresh salt.
    pub fn new(plain_text: &str) -> AppResult<Self> {
        Self::check_policy(plain_text)?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Could not hash password: {}", e)))?
            .to_string();
        Ok(Self { hash })
    }

    pub fn from_hash(hash: String) -> Self {
        Self { hash }
    }

    /// Stand-in for a missing account during login.
    pub fn dummy() -> Self {
        Self::from_hash(DUMMY_HASH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// False for a wrong password and for a stored hash that does not parse.
    pub fn verify(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                false
            }
        }
    }

    /// At least six characters with a lowercase letter, an uppercase letter and a digit.
    pub fn check_policy(plain_text: &str) -> AppResult<()> {
        if plain_text.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }

        let has = |pred: fn(&char) -> bool| plain_text.chars().any(|c| pred(&c));
        let mixed = has(char::is_ascii_lowercase)
            && has(char::is_ascii_uppercase)
            && has(char::is_ascii_digit);
        if !mixed {
            return Err(AppError::validation(
                "Password must contain at least one lowercase letter, one uppercase letter, and one number",
            ));
        }

        Ok(())
    }
}
