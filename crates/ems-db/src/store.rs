//! Employee store: identity lookups, department upsert and credential checks
//!
//! Lookups report a missing row as `Ok(None)`. `Err` is reserved for storage
//! faults, so callers can always tell "no such employee" apart from an outage.

use async_trait::async_trait;
use chrono::Utc;
use ems_auth::{CredentialHasher, PasswordError};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::entities::{department, employee};

/// Store errors. Absence of a row is never an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Another writer saved an employee with this username first
    #[error("Username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("Stored credential is unusable: {0}")]
    Credential(#[from] PasswordError),
}

/// Input for [`EmployeeStore::save_employee`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    /// Already-hashed password (PHC string)
    pub password_hash: String,
    pub email: String,
    pub date_of_birth: String,
    /// Resolved to a department id, creating the department if needed
    pub department_name: String,
    pub position: String,
}

/// Username and plaintext password submitted at login
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Persistence contract for employees and departments
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Id of the employee with `username`, `None` if there is none
    async fn resolve_employee_id_by_username(
        &self,
        username: &str,
    ) -> Result<Option<i32>, StoreError>;

    /// Id of the department named `name`, `None` if there is none
    async fn resolve_department_id_by_name(&self, name: &str) -> Result<Option<i32>, StoreError>;

    /// Name of the department with `id`, `None` if there is none
    async fn resolve_department_name_by_id(&self, id: i32) -> Result<Option<String>, StoreError>;

    /// All employees ordered by id; empty when there are none
    async fn list_employees(&self) -> Result<Vec<employee::Model>, StoreError>;

    /// Resolve or create the department, insert the employee, return its id.
    /// A username that already exists fails with [`StoreError::DuplicateUsername`].
    async fn save_employee(&self, record: &NewEmployee) -> Result<i32, StoreError>;

    /// Check a password against the stored hash; `false` for unknown usernames
    async fn authenticate(&self, credentials: &Credentials) -> Result<bool, StoreError>;
}

/// [`EmployeeStore`] backed by a SeaORM connection pool
pub struct SeaOrmEmployeeStore {
    db: DatabaseConnection,
    hasher: CredentialHasher,
}

impl SeaOrmEmployeeStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            hasher: CredentialHasher::default(),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

async fn find_department_id<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<Option<i32>, DbErr> {
    department::Entity::find()
        .select_only()
        .column(department::Column::Id)
        .filter(department::Column::Name.eq(name))
        .into_tuple::<i32>()
        .one(conn)
        .await
}

/// Insert a department, or return the id of the row a concurrent writer
/// inserted first.
async fn insert_department<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, DbErr> {
    let department = department::ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    };

    let inserted = department::Entity::insert(department)
        .on_conflict(
            OnConflict::column(department::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec(conn)
        .await;

    match inserted {
        Ok(result) => {
            info!(department = name, id = result.last_insert_id, "Created department");
            Ok(result.last_insert_id)
        }
        Err(DbErr::RecordNotInserted) => find_department_id(conn, name)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("department '{}'", name))),
        Err(e) => Err(e),
    }
}

/// Resolve-or-create the department, then insert the employee row
async fn insert_employee<C: ConnectionTrait>(
    conn: &C,
    record: &NewEmployee,
) -> Result<employee::Model, StoreError> {
    let department_id = match find_department_id(conn, &record.department_name).await? {
        Some(id) => id,
        None => insert_department(conn, &record.department_name).await?,
    };

    employee::ActiveModel {
        id: NotSet,
        first_name: Set(record.first_name.clone()),
        last_name: Set(record.last_name.clone()),
        username: Set(record.username.clone()),
        password_hash: Set(record.password_hash.clone()),
        email: Set(record.email.clone()),
        date_of_birth: Set(record.date_of_birth.clone()),
        department_id: Set(department_id),
        position: Set(record.position.clone()),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            StoreError::DuplicateUsername(record.username.clone())
        }
        _ => StoreError::Database(e),
    })
}

#[async_trait]
impl EmployeeStore for SeaOrmEmployeeStore {
    async fn resolve_employee_id_by_username(
        &self,
        username: &str,
    ) -> Result<Option<i32>, StoreError> {
        let id = employee::Entity::find()
            .select_only()
            .column(employee::Column::Id)
            .filter(employee::Column::Username.eq(username))
            .into_tuple::<i32>()
            .one(&self.db)
            .await?;

        debug!(username, ?id, "Resolved employee id");
        Ok(id)
    }

    async fn resolve_department_id_by_name(&self, name: &str) -> Result<Option<i32>, StoreError> {
        Ok(find_department_id(&self.db, name).await?)
    }

    async fn resolve_department_name_by_id(&self, id: i32) -> Result<Option<String>, StoreError> {
        let name = department::Entity::find_by_id(id)
            .select_only()
            .column(department::Column::Name)
            .into_tuple::<String>()
            .one(&self.db)
            .await?;

        Ok(name)
    }

    async fn list_employees(&self) -> Result<Vec<employee::Model>, StoreError> {
        let employees = employee::Entity::find()
            .order_by_asc(employee::Column::Id)
            .all(&self.db)
            .await?;

        Ok(employees)
    }

    async fn save_employee(&self, record: &NewEmployee) -> Result<i32, StoreError> {
        // A dropped transaction also rolls back, covering cancellation
        let txn = self.db.begin().await?;

        let saved = match insert_employee(&txn, record).await {
            Ok(saved) => saved,
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                return Err(e);
            }
        };

        txn.commit().await?;

        info!(
            username = %saved.username,
            id = saved.id,
            department_id = saved.department_id,
            "Saved employee"
        );
        Ok(saved.id)
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<bool, StoreError> {
        let stored_hash = employee::Entity::find()
            .select_only()
            .column(employee::Column::PasswordHash)
            .filter(employee::Column::Username.eq(credentials.username.as_str()))
            .into_tuple::<String>()
            .one(&self.db)
            .await?;

        match stored_hash {
            Some(hash) => Ok(self.hasher.verify(&credentials.password, &hash)?),
            None => {
                debug!(username = %credentials.username, "No stored credential");
                Ok(false)
            }
        }
    }
}
