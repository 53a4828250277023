//! Account database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Account, BankDetails, BaseSalary, Role};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub role: String,
    #[sea_orm(unique)]
    pub employee_code: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub joining_date: Date,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub basic_salary: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub allowances: Decimal,
    pub bank_account_number: Option<String>,
    pub bank_name: Option<String>,
    pub ifsc_code: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity
impl TryFrom<Model> for Account {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Account {
            id: model.id,
            name: model.name,
            email: model.email,
            password_hash: model.password_hash,
            role: model.role.parse::<Role>().map_err(|_| {
                AppError::internal(format!("Account {} has unknown role", model.id))
            })?,
            employee_code: model.employee_code,
            department: model.department,
            position: model.position,
            joining_date: model.joining_date,
            salary: BaseSalary {
                basic: model.basic_salary,
                allowances: model.allowances,
            },
            bank_details: BankDetails {
                account_number: model.bank_account_number,
                bank_name: model.bank_name,
                ifsc_code: model.ifsc_code,
            },
            is_active: model.is_active,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
