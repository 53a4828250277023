//! Migration: expense claims and their comment thread.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::Title).string_len(100).not_null())
                    .col(ColumnDef::new(Expenses::Description).text().not_null())
                    .col(
                        ColumnDef::new(Expenses::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Category).string_len(30).not_null())
                    .col(ColumnDef::new(Expenses::ExpenseDate).date().not_null())
                    .col(
                        ColumnDef::new(Expenses::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Expenses::ApprovedBy).uuid().null())
                    .col(
                        ColumnDef::new(Expenses::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Expenses::RejectionReason)
                            .string_len(200)
                            .null(),
                    )
                    .col(ColumnDef::new(Expenses::ReceiptFilename).string().null())
                    .col(ColumnDef::new(Expenses::ReceiptOriginalName).string().null())
                    .col(ColumnDef::new(Expenses::ReceiptPath).string().null())
                    .col(ColumnDef::new(Expenses::ReceiptSize).big_integer().null())
                    .col(ColumnDef::new(Expenses::ReceiptMimeType).string().null())
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Expenses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_employee")
                            .from(Expenses::Table, Expenses::EmployeeId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_approver")
                            .from(Expenses::Table, Expenses::ApprovedBy)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_employee_status")
                    .table(Expenses::Table)
                    .col(Expenses::EmployeeId)
                    .col(Expenses::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_status_created_at")
                    .table(Expenses::Table)
                    .col(Expenses::Status)
                    .col(Expenses::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_expense_date")
                    .table(Expenses::Table)
                    .col(Expenses::ExpenseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseComments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseComments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseComments::ExpenseId).uuid().not_null())
                    .col(ColumnDef::new(ExpenseComments::AuthorId).uuid().not_null())
                    .col(
                        ColumnDef::new(ExpenseComments::Message)
                            .string_len(300)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseComments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_comments_expense")
                            .from(ExpenseComments::Table, ExpenseComments::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_comments_author")
                            .from(ExpenseComments::Table, ExpenseComments::AuthorId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expense_comments_expense")
                    .table(ExpenseComments::Table)
                    .col(ExpenseComments::ExpenseId)
                    .col(ExpenseComments::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExpenseComments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    EmployeeId,
    Title,
    Description,
    Amount,
    Category,
    ExpenseDate,
    Status,
    ApprovedBy,
    ApprovedAt,
    RejectionReason,
    ReceiptFilename,
    ReceiptOriginalName,
    ReceiptPath,
    ReceiptSize,
    ReceiptMimeType,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ExpenseComments {
    Table,
    Id,
    ExpenseId,
    AuthorId,
    Message,
    CreatedAt,
}
