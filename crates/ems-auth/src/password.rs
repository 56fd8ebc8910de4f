//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

/// Longest plaintext accepted by [`CredentialHasher::hash`], in bytes.
pub const MAX_PASSWORD_LEN: usize = 4096;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Plaintext longer than [`MAX_PASSWORD_LEN`]
    #[error("Password exceeds the maximum length of 4096 bytes")]
    InputTooLong,

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Stored hash could not be parsed or is corrupt
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),

    /// Work factor rejected by Argon2
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),
}

/// Argon2id hasher with a configurable work factor.
///
/// The default uses the OWASP-recommended parameters shipped with the
/// `argon2` crate:
/// - Memory cost: 19456 KiB (19 MiB)
/// - Time cost: 2 iterations
/// - Parallelism: 1 thread
/// - Salt: 16 bytes (randomly generated per call)
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl CredentialHasher {
    /// Build a hasher with an explicit work factor
    ///
    /// # Arguments
    /// * `memory_kib` - Memory cost in KiB
    /// * `iterations` - Time cost
    /// * `parallelism` - Number of lanes
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password
    ///
    /// # Returns
    /// * `Ok(String)` - PHC-formatted hash string with salt and parameters embedded
    /// * `Err(PasswordError::InputTooLong)` - If the plaintext exceeds [`MAX_PASSWORD_LEN`]
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > MAX_PASSWORD_LEN {
            return Err(PasswordError::InputTooLong);
        }

        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// Verify a password against a stored hash
    ///
    /// Parameters are read from the hash itself, so hashes produced with a
    /// different work factor still verify.
    ///
    /// # Returns
    /// * `Ok(true)` - Password matches hash
    /// * `Ok(false)` - Password does not match hash
    /// * `Err(PasswordError::MalformedHash)` - If the stored hash is unusable
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
        }
    }
}

/// Hash a password using Argon2id with the default work factor
///
/// # Example
/// ```
/// use ems_auth::password::hash_password;
///
/// let hash = hash_password("MySecurePassword123!").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    CredentialHasher::default().hash(password)
}

/// Verify a password against a hash
///
/// # Example
/// ```
/// use ems_auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("MyPassword123!").unwrap();
/// assert!(verify_password("MyPassword123!", &hash).unwrap());
/// assert!(!verify_password("WrongPassword", &hash).unwrap());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    CredentialHasher::default().verify(password, hash)
}
