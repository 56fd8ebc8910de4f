//! JWT (JSON Web Token) issuance and verification

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of an issued token
pub const TOKEN_VALIDITY_HOURS: i64 = 24;

/// Claims carried by an employee identity token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Employee username
    pub username: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(username: String, validity: Duration) -> Self {
        Self::issued_at(username, Utc::now(), validity)
    }

    pub fn issued_at(username: String, issued_at: DateTime<Utc>, validity: Duration) -> Self {
        Self {
            username,
            iat: issued_at.timestamp(),
            exp: (issued_at + validity).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Token expired")]
    Expired,

    #[error("JWT encoding error: {0}")]
    EncodingError(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::MalformedToken,
        }
    }
}

/// Issues and verifies HS256 identity tokens with a process-wide secret.
///
/// Verification checks ONLY:
/// - Signature (using the secret)
/// - Expiration, with zero leeway
/// - Presence and type of the `username`, `iat` and `exp` claims
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    validity: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            validity: Duration::hours(TOKEN_VALIDITY_HOURS),
        }
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a token for `username`, valid from now for the configured validity
    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        if username.is_empty() {
            return Err(TokenError::EmptyUsername);
        }

        self.encode(&TokenClaims::new(username.to_string(), self.validity))
    }

    /// Sign arbitrary claims with this service's secret
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(TokenError::EncodingError)
    }

    /// Verify a token and return its username claim
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.decode(token)?;
        Ok(claims.username)
    }

    /// Verify a token and return all of its claims
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;

        if token_data.claims.is_expired() {
            return Err(TokenError::Expired);
        }

        if token_data.claims.username.is_empty() {
            return Err(TokenError::MalformedToken);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test_secret_key_1234567890";

    #[test]
    fn test_issue_verify_roundtrip() {
        let service = TokenService::new(TEST_SECRET);

        for username in ["alice", "bob.smith", "ü-ñ", "x"] {
            let token = service.issue(username).unwrap();
            assert_eq!(service.verify(&token).unwrap(), username);
        }
    }

    #[test]
    fn test_issue_empty_username() {
        let service = TokenService::new(TEST_SECRET);
        assert!(matches!(service.issue(""), Err(TokenError::EmptyUsername)));
    }

    #[test]
    fn test_claims_expire_after_24_hours() {
        let service = TokenService::new(TEST_SECRET);
        let token = service.issue("alice").unwrap();
        let claims = service.decode(&token).unwrap();

        let now = Utc::now().timestamp();
        assert!(claims.iat <= now && claims.iat >= now - 5);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_expired_token() {
        let service = TokenService::new(TEST_SECRET);
        let claims = TokenClaims::issued_at(
            "alice".to_string(),
            Utc::now() - Duration::hours(25),
            Duration::hours(TOKEN_VALIDITY_HOURS),
        );
        assert!(claims.is_expired());

        let token = service.encode(&claims).unwrap();

        assert!(matches!(service.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret() {
        let issuer = TokenService::new(b"secret-one-that-is-32-chars-long");
        let verifier = TokenService::new(b"secret-two-that-is-32-chars-long");

        let token = issuer.issue("alice").unwrap();

        assert!(matches!(
            verifier.verify(&token),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_malformed_token() {
        let service = TokenService::new(TEST_SECRET);

        for token in ["", "not-a-token", "a.b", "invalid.token.here"] {
            assert!(
                matches!(service.verify(token), Err(TokenError::MalformedToken)),
                "{token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_missing_username_claim() {
        let service = TokenService::new(TEST_SECRET);
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "exp": exp, "iat": exp - 3600 }),
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        assert!(matches!(
            service.verify(&token),
            Err(TokenError::MalformedToken)
        ));
    }

    #[test]
    fn test_mistyped_username_claim() {
        let service = TokenService::new(TEST_SECRET);
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "username": 42, "exp": exp, "iat": exp - 3600 }),
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        assert!(matches!(
            service.verify(&token),
            Err(TokenError::MalformedToken)
        ));
    }

    #[test]
    fn test_empty_username_claim_rejected() {
        let service = TokenService::new(TEST_SECRET);
        let token = service
            .encode(&TokenClaims::new(String::new(), Duration::hours(1)))
            .unwrap();

        assert!(matches!(
            service.verify(&token),
            Err(TokenError::MalformedToken)
        ));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let service = TokenService::new(TEST_SECRET);
        let claims = TokenClaims::new("alice".to_string(), Duration::hours(1));
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        assert!(matches!(
            service.verify(&token),
            Err(TokenError::MalformedToken)
        ));
    }

    #[test]
    fn test_custom_validity() {
        let service = TokenService::new(TEST_SECRET).with_validity(Duration::minutes(5));
        let token = service.issue("alice").unwrap();
        let claims = service.decode(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, 300);
        assert_eq!(service.validity(), Duration::minutes(5));
    }
}
