//! Salary slip database entity for SeaORM.
//!
//! Allowance and deduction components are stored as one column each.

use sea_orm::entity::prelude::*;

use crate::domain::{Allowances, Deductions, SalarySlip, SlipStatus, WorkingDays};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "salary_slips")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub employee_id: Uuid,
    pub month: i32,
    pub year: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub basic_salary: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub hra: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub transport_allowance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub medical_allowance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub special_allowance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub other_allowance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub tax: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub pf: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub insurance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub other_deduction: Decimal,
    pub total_days: i32,
    pub worked_days: i32,
    pub status: String,
    pub generated_by: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub gross_salary: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub net_salary: Decimal,
    pub document_path: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub finalized_at: Option<DateTimeUtc>,
    pub sent_at: Option<DateTimeUtc>,
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
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for SalarySlip {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(SalarySlip {
            id: model.id,
            employee_id: model.employee_id,
            month: u32::try_from(model.month).map_err(|_| {
                AppError::internal(format!("Salary slip {} has invalid month", model.id))
            })?,
            year: model.year,
            basic_salary: model.basic_salary,
            allowances: Allowances {
                hra: model.hra,
                transport: model.transport_allowance,
                medical: model.medical_allowance,
                special: model.special_allowance,
                other: model.other_allowance,
            },
            deductions: Deductions {
                tax: model.tax,
                pf: model.pf,
                insurance: model.insurance,
                other: model.other_deduction,
            },
            working_days: WorkingDays {
                total: model.total_days,
                worked: model.worked_days,
            },
            status: model.status.parse::<SlipStatus>().map_err(|_| {
                AppError::internal(format!("Salary slip {} has unknown status", model.id))
            })?,
            generated_by: model.generated_by,
            gross_salary: model.gross_salary,
            net_salary: model.net_salary,
            document_path: model.document_path,
            notes: model.notes,
            finalized_at: model.finalized_at,
            sent_at: model.sent_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
