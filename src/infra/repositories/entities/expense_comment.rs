//! Expense comment database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::ExpenseComment;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub expense_id: Uuid,
    pub author_id: Uuid,
    pub message: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expense::Entity",
        from = "Column::ExpenseId",
        to = "super::expense::Column::Id",
        on_delete = "Cascade"
    )]
    Expense,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ExpenseComment {
    fn from(model: Model) -> Self {
        ExpenseComment {
            id: model.id,
            expense_id: model.expense_id,
            author_id: model.author_id,
            message: model.message,
            created_at: model.created_at,
        }
    }
}
