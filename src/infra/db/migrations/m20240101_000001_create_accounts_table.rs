//! Migration: accounts table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Accounts::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Accounts::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::Role)
                            .string_len(20)
                            .not_null()
                            .default("employee"),
                    )
                    .col(ColumnDef::new(Accounts::EmployeeCode).string_len(20).null())
                    .col(ColumnDef::new(Accounts::Department).string_len(30).null())
                    .col(ColumnDef::new(Accounts::Position).string_len(50).null())
                    .col(
                        ColumnDef::new(Accounts::JoiningDate)
                            .date()
                            .not_null()
                            .default(Expr::current_date()),
                    )
                    .col(
                        ColumnDef::new(Accounts::BasicSalary)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::Allowances)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Accounts::BankAccountNumber).string().null())
                    .col(ColumnDef::new(Accounts::BankName).string().null())
                    .col(ColumnDef::new(Accounts::IfscCode).string_len(20).null())
                    .col(
                        ColumnDef::new(Accounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Accounts::LastLoginAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // NULL codes (admins) do not collide
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_employee_code")
                    .table(Accounts::Table)
                    .col(Accounts::EmployeeCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_role")
                    .table(Accounts::Table)
                    .col(Accounts::Role)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    Role,
    EmployeeCode,
    Department,
    Position,
    JoiningDate,
    BasicSalary,
    Allowances,
    BankAccountNumber,
    BankName,
    IfscCode,
    IsActive,
    LastLoginAt,
    CreatedAt,
    UpdatedAt,
}
