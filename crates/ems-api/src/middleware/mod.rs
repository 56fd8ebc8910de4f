//! API Middleware

pub mod auth;

pub use auth::{bearer_token, require_auth, AuthState, Principal};
