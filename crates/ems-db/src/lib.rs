//! Persistence for the employee directory
//!
//! SeaORM entities and migrations for `departments` and `employees`, plus the
//! [`EmployeeStore`] contract used by the HTTP layer.

pub mod entities;
pub mod migrator;
pub mod store;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

pub use store::{Credentials, EmployeeStore, NewEmployee, SeaOrmEmployeeStore, StoreError};

#[cfg(feature = "mock")]
pub use store::MockEmployeeStore;

/// Open a connection pool for `database_url` (e.g. `sqlite::memory:`,
/// `sqlite://ems.db?mode=rwc`, `postgres://...`)
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    info!("Connected to {:?} database", db.get_database_backend());
    Ok(db)
}

/// Apply all pending migrations
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running database migrations");
    migrator::Migrator::up(db, None).await
}
