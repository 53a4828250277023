//! Migration: per-account notification feed.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::AccountId).uuid().not_null())
                    .col(
                        ColumnDef::new(Notifications::Title)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::Message)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::Kind)
                            .string_len(20)
                            .not_null()
                            .default("info"),
                    )
                    .col(
                        ColumnDef::new(Notifications::Category)
                            .string_len(30)
                            .not_null()
                            .default("other"),
                    )
                    .col(
                        ColumnDef::new(Notifications::Priority)
                            .string_len(10)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Notifications::Read)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::ReadAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Notifications::ActionUrl).string().null())
                    .col(
                        ColumnDef::new(Notifications::ActionText)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::RelatedModel)
                            .string_len(20)
                            .null(),
                    )
                    .col(ColumnDef::new(Notifications::RelatedId).uuid().null())
                    .col(
                        ColumnDef::new(Notifications::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Notifications::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_account")
                            .from(Notifications::Table, Notifications::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_account_read_created")
                    .table(Notifications::Table)
                    .col(Notifications::AccountId)
                    .col(Notifications::Read)
                    .col(Notifications::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_expires_at")
                    .table(Notifications::Table)
                    .col(Notifications::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    AccountId,
    Title,
    Message,
    Kind,
    Category,
    Priority,
    Read,
    ReadAt,
    ActionUrl,
    ActionText,
    RelatedModel,
    RelatedId,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}
