use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, SaltString};
use tracing::instrument;

use crate::config::HashingConfig;
use crate::error::AppError;

/// Argon2id hashing. Work runs on the blocking pool so request tasks keep moving.
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    pub fn new(config: HashingConfig) -> Result<Self, AppError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            Some(32),
        )
        .map_err(|e| AppError::Internal(format!("invalid Argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    #[instrument(name = "passwords::hash", skip_all, err(Display))]
    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let argon2 = self.argon2();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
        })
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
    }

    /// `Ok(false)` on mismatch; errors only for unreadable stored hashes.
    #[instrument(name = "passwords::verify", skip_all, err(Display))]
    pub async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, AppError> {
        // Parameters are taken from the stored PHC string, not from `self.params`.
        let argon2 = self.argon2();
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash)
                .map_err(|e| AppError::Internal(format!("stored password hash unreadable: {e}")))?;
            match argon2.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AppError::Internal(format!("password verification failed: {e}"))),
            }
        })
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?
    }
}
