//! API route handlers

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use ems_auth::PasswordError;
use ems_db::{Credentials, NewEmployee, StoreError};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::middleware::Principal;
use crate::models::*;
use crate::AppState;

/// Log in, registering the employee on first use
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed or incomplete request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    match state
        .store
        .resolve_employee_id_by_username(&req.username)
        .await?
    {
        Some(id) => {
            check_password(&state, &req).await?;
            info!(username = %req.username, id, "Employee logged in");
        }
        None => {
            let department_name = department_for(&state, &req).await?;
            let password_hash = state.hasher.hash(&req.password).map_err(|e| match e {
                PasswordError::InputTooLong => ApiError::BadRequest(e.to_string()),
                other => ApiError::Internal(other.to_string()),
            })?;

            let saved = state
                .store
                .save_employee(&NewEmployee {
                    first_name: req.first_name.clone(),
                    last_name: req.last_name.clone(),
                    username: req.username.clone(),
                    password_hash,
                    email: req.email.clone(),
                    date_of_birth: req.dob.clone(),
                    department_name,
                    position: req.position.clone(),
                })
                .await;

            match saved {
                Ok(id) => {
                    info!(username = %req.username, id, "Registered employee on first login");
                }
                Err(StoreError::DuplicateUsername(_)) => {
                    // A concurrent first login registered this username
                    debug!(username = %req.username, "Username registered concurrently");
                    check_password(&state, &req).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    let token = state
        .tokens
        .issue(&req.username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(LoginResponse { token }))
}

async fn check_password(state: &AppState, req: &LoginRequest) -> ApiResult<()> {
    let credentials = Credentials::new(req.username.as_str(), req.password.as_str());
    if !state.store.authenticate(&credentials).await? {
        warn!(username = %req.username, "Login failed: invalid credentials");
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

/// Department name for a new employee: `departmentName` wins, otherwise the
/// name of the existing department `departmentID`.
async fn department_for(state: &AppState, req: &LoginRequest) -> ApiResult<String> {
    if let Some(name) = req.department_name.as_deref().filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }

    let id = req.department_id.ok_or_else(|| {
        ApiError::BadRequest("departmentName or departmentID is required".to_string())
    })?;

    state
        .store
        .resolve_department_name_by_id(id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("unknown departmentID {}", id)))
}

/// List all employees
#[utoipa::path(
    get,
    path = "/employees",
    responses(
        (status = 200, description = "All employees", body = [Employee]),
        (status = 403, description = "Missing, invalid or expired token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "employees"
)]
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> ApiResult<Json<Vec<Employee>>> {
    debug!(username = %principal.username, "Listing employees");

    let models = state.store.list_employees().await?;

    let mut departments: HashMap<i32, Option<String>> = HashMap::new();
    let mut employees = Vec::with_capacity(models.len());
    for model in models {
        let department_name = match departments.get(&model.department_id) {
            Some(name) => name.clone(),
            None => {
                let name = state
                    .store
                    .resolve_department_name_by_id(model.department_id)
                    .await?;
                departments.insert(model.department_id, name.clone());
                name
            }
        };
        employees.push(Employee::from_model(model, department_name));
    }

    Ok(Json(employees))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
    })
}
