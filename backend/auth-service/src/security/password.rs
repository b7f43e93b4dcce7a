/// Password hashing and verification using Argon2id
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version,
};
use rand::rngs::OsRng;

use crate::error::{AuthError, Result};

/// Opaque password-verification capability
pub trait SecretHasher: Send + Sync {
    /// Produce storable verification material (a PHC string)
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// `Ok(false)` on mismatch; `Err` when `stored` is not valid material
    fn verify(&self, plaintext: &str, stored: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl Argon2Hasher {
    /// Argon2id with explicit memory (KiB), iteration and lane costs
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| AuthError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl SecretHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| AuthError::Internal("Failed to hash password".to_string()))?
            .to_string();

        Ok(password_hash)
    }

    fn verify(&self, plaintext: &str, stored: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(stored)
            .map_err(|_| AuthError::Internal("Invalid password hash format".to_string()))?;

        // Parameters come from the stored PHC string, not from `self`
        Ok(self
            .argon2
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
