//! API request and response models

use ems_db::entities::employee;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Login request.
///
/// An unknown `username` registers a new employee with these details; a known
/// one is checked against the stored password.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    /// Date of birth
    #[serde(default)]
    pub dob: String,
    /// Existing department, used when `departmentName` is absent
    #[serde(rename = "departmentID", default)]
    pub department_id: Option<i32>,
    /// Department name, created if it does not exist yet
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default)]
    pub position: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Signed identity token, valid for 24 hours
    pub token: String,
}

/// Employee as exposed by the API. The password hash is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub dob: String,
    #[serde(rename = "departmentID")]
    pub department_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
    pub position: String,
}

impl Employee {
    pub fn from_model(model: employee::Model, department_name: Option<String>) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            username: model.username,
            email: model.email,
            dob: model.date_of_birth,
            department_id: model.department_id,
            department_name,
            position: model.position,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}
