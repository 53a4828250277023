//! Expense claim database entity for SeaORM.

use sea_orm::entity::prelude::*;

use super::expense_comment;
use crate::domain::{Expense, ExpenseCategory, ExpenseComment, ExpenseStatus, Receipt};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub employee_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub category: String,
    pub expense_date: Date,
    pub status: String,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTimeUtc>,
    pub rejection_reason: Option<String>,
    pub receipt_filename: Option<String>,
    pub receipt_original_name: Option<String>,
    pub receipt_path: Option<String>,
    pub receipt_size: Option<i64>,
    pub receipt_mime_type: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::EmployeeId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Employee,
    #[sea_orm(has_many = "super::expense_comment::Entity")]
    Comments,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::expense_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    fn receipt(&self) -> Option<Receipt> {
        match (&self.receipt_filename, &self.receipt_path) {
            (Some(filename), Some(path)) => Some(Receipt {
                filename: filename.clone(),
                original_name: self
                    .receipt_original_name
                    .clone()
                    .unwrap_or_else(|| filename.clone()),
                path: path.clone(),
                size: self.receipt_size.unwrap_or_default(),
                mime_type: self
                    .receipt_mime_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
            }),
            _ => None,
        }
    }

    /// Domain entity with the comment thread attached, oldest comment first.
    pub fn into_domain(
        self,
        mut comments: Vec<expense_comment::Model>,
    ) -> Result<Expense, AppError> {
        comments.sort_by_key(|c| c.created_at);
        let receipt = self.receipt();

        Ok(Expense {
            id: self.id,
            employee_id: self.employee_id,
            title: self.title,
            description: self.description,
            amount: self.amount,
            category: self.category.parse::<ExpenseCategory>().map_err(|_| {
                AppError::internal(format!("Expense {} has unknown category", self.id))
            })?,
            expense_date: self.expense_date,
            status: self.status.parse::<ExpenseStatus>().map_err(|_| {
                AppError::internal(format!("Expense {} has unknown status", self.id))
            })?,
            approved_by: self.approved_by,
            approved_at: self.approved_at,
            rejection_reason: self.rejection_reason,
            receipt,
            comments: comments.into_iter().map(ExpenseComment::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
