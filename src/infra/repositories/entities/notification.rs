//! Notification database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Notification, NotificationCategory, NotificationType, Priority, RelatedModel};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub category: String,
    pub priority: String,
    pub read: bool,
    pub read_at: Option<DateTimeUtc>,
    pub action_url: Option<String>,
    pub action_text: Option<String>,
    pub related_model: Option<String>,
    pub related_id: Option<Uuid>,
    pub expires_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn corrupt(id: Uuid, field: &str) -> AppError {
    AppError::internal(format!("Notification {} has unknown {}", id, field))
}

impl TryFrom<Model> for Notification {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let id = model.id;
        Ok(Notification {
            id,
            account_id: model.account_id,
            title: model.title,
            message: model.message,
            kind: model
                .kind
                .parse::<NotificationType>()
                .map_err(|_| corrupt(id, "type"))?,
            category: model
                .category
                .parse::<NotificationCategory>()
                .map_err(|_| corrupt(id, "category"))?,
            priority: model
                .priority
                .parse::<Priority>()
                .map_err(|_| corrupt(id, "priority"))?,
            read: model.read,
            read_at: model.read_at,
            action_url: model.action_url,
            action_text: model.action_text,
            related_model: model
                .related_model
                .as_deref()
                .map(str::parse::<RelatedModel>)
                .transpose()
                .map_err(|_| corrupt(id, "related model"))?,
            related_id: model.related_id,
            expires_at: model.expires_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
