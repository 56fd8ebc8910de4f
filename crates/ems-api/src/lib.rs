//! HTTP API for the employee directory
//!
//! `POST /login` and `GET /health` are public; `GET /employees` sits behind
//! [`middleware::require_auth`].

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use ems_auth::{CredentialHasher, TokenService};
use ems_db::EmployeeStore;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

pub use error::{ApiError, ApiResult};
pub use middleware::Principal;

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<dyn EmployeeStore>,
    pub tokens: Arc<TokenService>,
    pub hasher: CredentialHasher,
    pub version: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Directory API",
        description = "Login and employee listing for the employee directory"
    ),
    paths(handlers::login, handlers::list_employees, handlers::health_check),
    components(schemas(
        models::ErrorResponse,
        models::LoginRequest,
        models::LoginResponse,
        models::Employee,
        models::HealthResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "employees", description = "Employee directory endpoints"),
        (name = "system", description = "System health and info endpoints")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS for localhost origins (for development)
    pub enable_cors: bool,
    /// Deadline for a whole request
    pub request_timeout: Duration,
    /// Version reported by `/health`
    pub version: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            enable_cors: false,
            request_timeout: Duration::from_secs(30),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiServerConfig,
        store: Arc<dyn EmployeeStore>,
        tokens: Arc<TokenService>,
        hasher: CredentialHasher,
    ) -> Self {
        let state = Arc::new(AppState {
            store,
            tokens,
            hasher,
            version: config.version.clone(),
        });

        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let auth_state = Arc::new(middleware::AuthState::new(
            self.state.tokens.clone(),
            self.state.store.clone(),
        ));

        // Build PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/login", post(handlers::login))
            .route("/health", get(handlers::health_check))
            .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
            .with_state(self.state.clone());

        // Build PROTECTED routes (require a bearer token)
        let protected_router = Router::new()
            .route("/employees", get(handlers::list_employees))
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                auth_state,
                middleware::require_auth,
            ));

        let mut router = public_router
            .merge(protected_router)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(timeout_layer(self.config.request_timeout)),
            );

        if self.config.enable_cors {
            use tower_http::cors::AllowOrigin;

            let cors = CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
                    let origin_str = origin.to_str().unwrap_or("");
                    origin_str.starts_with("http://localhost:")
                        || origin_str.starts_with("http://127.0.0.1:")
                        || origin_str.starts_with("https://localhost:")
                        || origin_str.starts_with("https://127.0.0.1:")
                }));

            router = router.layer(cors);
        }

        router
    }

    /// Start the API server and run until Ctrl-C
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        info!("Starting API server on {}", listener.local_addr()?);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        info!("API server stopped");
        Ok(())
    }
}

/// Requests still running after `timeout` are answered with 408
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
