//! Credential hashing and identity tokens for the employee directory

pub mod jwt;
pub mod password;

pub use jwt::{TokenClaims, TokenError, TokenService, TOKEN_VALIDITY_HOURS};
pub use password::{
    hash_password, verify_password, CredentialHasher, PasswordError, MAX_PASSWORD_LEN,
};
