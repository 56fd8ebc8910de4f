//! Initial schema: departments and employees

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. Create departments table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Department::Table)
                    .if_not_exists()
                    .col(pk_auto(Department::Id))
                    .col(string_len(Department::Name, 255).not_null().unique_key())
                    .col(
                        timestamp_with_time_zone(Department::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. Create employees table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Employee::Table)
                    .if_not_exists()
                    .col(pk_auto(Employee::Id))
                    .col(string_len(Employee::FirstName, 255).not_null())
                    .col(string_len(Employee::LastName, 255).not_null())
                    .col(string_len(Employee::Username, 255).not_null().unique_key())
                    .col(string_len(Employee::PasswordHash, 255).not_null())
                    .col(string_len(Employee::Email, 255).not_null())
                    .col(string_len(Employee::DateOfBirth, 32).not_null())
                    .col(integer(Employee::DepartmentId).not_null())
                    .col(string_len(Employee::Position, 255).not_null().default(""))
                    .col(
                        timestamp_with_time_zone(Employee::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employees_department_id")
                            .from(Employee::Table, Employee::DepartmentId)
                            .to(Department::Table, Department::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_employees_department_id")
                    .table(Employee::Table)
                    .col(Employee::DepartmentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Employee::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Department::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Department {
    #[sea_orm(iden = "departments")]
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Employee {
    #[sea_orm(iden = "employees")]
    Table,
    Id,
    FirstName,
    LastName,
    Username,
    PasswordHash,
    Email,
    DateOfBirth,
    DepartmentId,
    Position,
    CreatedAt,
}
