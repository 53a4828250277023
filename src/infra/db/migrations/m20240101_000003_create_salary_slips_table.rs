//! Migration: salary slips, one per employee and pay period.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn money(column: SalarySlips) -> ColumnDef {
    ColumnDef::new(column)
        .decimal_len(12, 2)
        .not_null()
        .default(0)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SalarySlips::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalarySlips::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SalarySlips::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(SalarySlips::Month).integer().not_null())
                    .col(ColumnDef::new(SalarySlips::Year).integer().not_null())
                    .col(&mut money(SalarySlips::BasicSalary))
                    .col(&mut money(SalarySlips::Hra))
                    .col(&mut money(SalarySlips::TransportAllowance))
                    .col(&mut money(SalarySlips::MedicalAllowance))
                    .col(&mut money(SalarySlips::SpecialAllowance))
                    .col(&mut money(SalarySlips::OtherAllowance))
                    .col(&mut money(SalarySlips::Tax))
                    .col(&mut money(SalarySlips::Pf))
                    .col(&mut money(SalarySlips::Insurance))
                    .col(&mut money(SalarySlips::OtherDeduction))
                    .col(ColumnDef::new(SalarySlips::TotalDays).integer().not_null())
                    .col(ColumnDef::new(SalarySlips::WorkedDays).integer().not_null())
                    .col(
                        ColumnDef::new(SalarySlips::Status)
                            .string_len(20)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(SalarySlips::GeneratedBy).uuid().not_null())
                    .col(&mut money(SalarySlips::GrossSalary))
                    .col(&mut money(SalarySlips::NetSalary))
                    .col(ColumnDef::new(SalarySlips::DocumentPath).string().null())
                    .col(ColumnDef::new(SalarySlips::Notes).text().null())
                    .col(
                        ColumnDef::new(SalarySlips::FinalizedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SalarySlips::SentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SalarySlips::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SalarySlips::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_salary_slips_employee")
                            .from(SalarySlips::Table, SalarySlips::EmployeeId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_salary_slips_generated_by")
                            .from(SalarySlips::Table, SalarySlips::GeneratedBy)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_salary_slips_employee_period")
                    .table(SalarySlips::Table)
                    .col(SalarySlips::EmployeeId)
                    .col(SalarySlips::Month)
                    .col(SalarySlips::Year)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_salary_slips_status")
                    .table(SalarySlips::Table)
                    .col(SalarySlips::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SalarySlips::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}

#[derive(Iden)]
enum SalarySlips {
    Table,
    Id,
    EmployeeId,
    Month,
    Year,
    BasicSalary,
    Hra,
    TransportAllowance,
    MedicalAllowance,
    SpecialAllowance,
    OtherAllowance,
    Tax,
    Pf,
    Insurance,
    OtherDeduction,
    TotalDays,
    WorkedDays,
    Status,
    GeneratedBy,
    GrossSalary,
    NetSalary,
    DocumentPath,
    Notes,
    FinalizedAt,
    SentAt,
    CreatedAt,
    UpdatedAt,
}
