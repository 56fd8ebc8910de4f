//! Bearer token authentication middleware
//!
//! Validates the token from the `Authorization` header, resolves the employee
//! it names and makes the resulting [`Principal`] available to handlers.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts, Extensions, HeaderMap},
    middleware::Next,
    response::Response,
};
use ems_auth::{TokenError, TokenService};
use ems_db::EmployeeStore;
use std::{convert::Infallible, sync::Arc};
use tracing::{debug, warn};

use crate::error::ApiError;

/// Authenticated employee attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Username carried by the token
    pub username: String,
    /// Employee id resolved from storage
    pub id: i32,
}

impl Principal {
    /// Principal inserted by [`require_auth`], if it ran for this request
    pub fn from_extensions(extensions: &Extensions) -> Option<&Principal> {
        extensions.get::<Principal>()
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Principal::from_extensions(&parts.extensions)
            .cloned()
            .ok_or(ApiError::Forbidden("MISSING_PRINCIPAL"))
    }
}

impl<S> OptionalFromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Principal::from_extensions(&parts.extensions).cloned())
    }
}

/// Shared state for [`require_auth`]
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub store: Arc<dyn EmployeeStore>,
}

impl AuthState {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn EmployeeStore>) -> Self {
        Self { tokens, store }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// The value must be exactly two space-separated parts with a
/// case-insensitive `bearer` scheme. Anything else counts as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    let mut parts = value.split(' ');
    let (scheme, token) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || token.is_empty() {
        return None;
    }

    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

fn token_error_code(err: &TokenError) -> &'static str {
    match err {
        TokenError::Expired => "TOKEN_EXPIRED",
        TokenError::BadSignature => "BAD_SIGNATURE",
        _ => "INVALID_TOKEN",
    }
}

/// Reject the request with 403 unless it carries a valid token for a known
/// employee. On success the [`Principal`] is inserted into the request
/// extensions and the request is passed on unchanged.
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        warn!(path = %request.uri().path(), "Missing or malformed Authorization header");
        ApiError::Forbidden("MISSING_AUTH")
    })?;

    let username = state.tokens.verify(token).map_err(|e| {
        warn!(error = %e, "Token rejected");
        ApiError::Forbidden(token_error_code(&e))
    })?;

    let id = match state.store.resolve_employee_id_by_username(&username).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            warn!(%username, "Token names an unknown employee");
            return Err(ApiError::Forbidden("UNKNOWN_PRINCIPAL"));
        }
        Err(e) => {
            warn!(%username, error = %e, "Could not resolve principal");
            return Err(ApiError::Forbidden("UNKNOWN_PRINCIPAL"));
        }
    };

    debug!(%username, id, "Authenticated request");
    request.extensions_mut().insert(Principal { username, id });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorResponse;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use chrono::{Duration, Utc};
    use ems_auth::TokenClaims;
    use ems_db::{MockEmployeeStore, StoreError};
    use sea_orm::DbErr;
    use tower::ServiceExt; // For oneshot()

    const TEST_SECRET: &[u8] = b"test-secret-key-that-is-32-bytes";

    async fn protected_handler(principal: Principal) -> String {
        format!("{}:{}", principal.username, principal.id)
    }

    async fn optional_handler(principal: Option<Principal>) -> String {
        match principal {
            Some(p) => p.username,
            None => "anonymous".to_string(),
        }
    }

    fn store_with(username: &'static str, id: Option<i32>) -> MockEmployeeStore {
        let mut store = MockEmployeeStore::new();
        store
            .expect_resolve_employee_id_by_username()
            .withf(move |name| name == username)
            .returning(move |_| Ok(id));
        store
    }

    fn create_test_app(store: MockEmployeeStore) -> Router {
        let state = Arc::new(AuthState::new(
            Arc::new(TokenService::new(TEST_SECRET)),
            Arc::new(store),
        ));

        Router::new()
            .route("/protected", get(protected_handler))
            .layer(middleware::from_fn_with_state(state, require_auth))
    }

    async fn send(app: Router, authorization: Option<&str>) -> Response {
        let mut builder = axum::http::Request::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn error_body(response: Response) -> ErrorResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_attaches_principal() {
        let app = create_test_app(store_with("alice", Some(7)));
        let token = TokenService::new(TEST_SECRET).issue("alice").unwrap();

        let response = send(app, Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"alice:7");
    }

    #[tokio::test]
    async fn test_lowercase_scheme_accepted() {
        let app = create_test_app(store_with("alice", Some(7)));
        let token = TokenService::new(TEST_SECRET).issue("alice").unwrap();

        let response = send(app, Some(&format!("bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_key_rejected() {
        // The store must never be consulted for a bad signature
        let app = create_test_app(MockEmployeeStore::new());
        let token = TokenService::new(b"some-other-secret-also-32-bytes!")
            .issue("alice")
            .unwrap();

        let response = send(app, Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let error = error_body(response).await;
        assert_eq!(error.error, "invalid token");
        assert_eq!(error.code.as_deref(), Some("BAD_SIGNATURE"));
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let app = create_test_app(MockEmployeeStore::new());

        let response = send(app, None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let error = error_body(response).await;
        assert_eq!(error.code.as_deref(), Some("MISSING_AUTH"));
    }

    #[tokio::test]
    async fn test_malformed_header_shapes_rejected() {
        let token = TokenService::new(TEST_SECRET).issue("alice").unwrap();

        for value in [
            token.clone(),
            format!("Token {}", token),
            format!("Bearer {} extra", token),
            format!("Bearer  {}", token),
            "Bearer ".to_string(),
        ] {
            let app = create_test_app(MockEmployeeStore::new());
            let response = send(app, Some(&value)).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", value);
        }
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let app = create_test_app(MockEmployeeStore::new());
        let service = TokenService::new(TEST_SECRET);
        let claims = TokenClaims::issued_at(
            "alice".to_string(),
            Utc::now() - Duration::hours(25),
            Duration::hours(24),
        );
        let token = service.encode(&claims).unwrap();

        let response = send(app, Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let error = error_body(response).await;
        assert_eq!(error.code.as_deref(), Some("TOKEN_EXPIRED"));
    }

    #[tokio::test]
    async fn test_unresolved_username_rejected() {
        let app = create_test_app(store_with("ghost", None));
        let token = TokenService::new(TEST_SECRET).issue("ghost").unwrap();

        let response = send(app, Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_store_error_rejected() {
        let mut store = MockEmployeeStore::new();
        store
            .expect_resolve_employee_id_by_username()
            .returning(|_| Err(StoreError::Database(DbErr::Custom("pool closed".into()))));
        let app = create_test_app(store);
        let token = TokenService::new(TEST_SECRET).issue("alice").unwrap();

        let response = send(app, Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(!String::from_utf8_lossy(&body).contains("pool closed"));
    }

    #[tokio::test]
    async fn test_extractor_without_middleware() {
        let app = Router::new()
            .route("/protected", get(protected_handler))
            .route("/optional", get(optional_handler));

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/protected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/optional")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"anonymous");
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "BEARER abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwdw==".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
