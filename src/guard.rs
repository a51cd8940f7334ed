//! Password protection for individual notes.
//!
//! Hashes are argon2id PHC strings with a fresh random salt each time. The
//! cost parameters live in [`HasherConfig`]; verification reads them back
//! from the stored hash, so changing the config never invalidates old notes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::error::{NotesError, Result};
use crate::models::PasswordHash;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Hashes and verifies note passwords.
#[derive(Debug, Clone)]
pub struct PasswordGuard {
    params: Params,
}

impl PasswordGuard {
    pub fn new(config: HasherConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| NotesError::Hashing(e.to_string()))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password with a fresh salt.
    pub fn hash(&self, plaintext: &str) -> Result<PasswordHash> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| PasswordHash::new(h.to_string()))
            .map_err(|e| NotesError::Hashing(e.to_string()))
    }

    /// Check `plaintext` against a note's hash. A note without a hash is
    /// unprotected, so anything verifies.
    pub fn verify(&self, plaintext: &str, hash: Option<&PasswordHash>) -> Result<bool> {
        let Some(hash) = hash else {
            return Ok(true);
        };

        let parsed = password_hash::PasswordHash::new(hash.as_str())
            .map_err(|e| NotesError::Hashing(e.to_string()))?;

        match self.hasher().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(NotesError::Hashing(e.to_string())),
        }
    }
}

impl Default for PasswordGuard {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}
