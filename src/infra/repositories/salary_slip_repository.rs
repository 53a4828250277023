//! Salary slip repository.
//!
//! Status moves `draft → finalized → sent` through conditional updates, so two
//! concurrent requests can never both advance the same slip.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use super::entities::salary_slip::{self, ActiveModel, Entity as SlipEntity};
use crate::domain::salary::{MonthlyPayout, SalaryOverview, YearlyPayout};
use crate::domain::{
    NewSalarySlip, PayPeriod, SalarySlip, SalaryStats, SlipFilter, SlipRevision, SlipStatus,
};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Salary slip repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SalarySlipRepository: Send + Sync {
    /// Insert a draft; a second slip for the same employee and period is a conflict
    async fn create(&self, slip: NewSalarySlip) -> AppResult<SalarySlip>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SalarySlip>>;

    async fn find_for_period(
        &self,
        employee_id: Uuid,
        period: PayPeriod,
    ) -> AppResult<Option<SalarySlip>>;

    /// Filtered page, most recent period first
    async fn list(
        &self,
        filter: SlipFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<SalarySlip>, u64)>;

    /// Replace amounts and notes if the slip is still a draft
    async fn update_draft(&self, id: Uuid, revision: SlipRevision)
        -> AppResult<Option<SalarySlip>>;

    /// Move `from → to` if the slip is still in `from`
    async fn transition(
        &self,
        id: Uuid,
        from: SlipStatus,
        to: SlipStatus,
    ) -> AppResult<Option<SalarySlip>>;

    async fn set_document(&self, id: Uuid, path: String) -> AppResult<Option<SalarySlip>>;

    /// Delete if still a draft; `false` when nothing was deleted
    async fn delete_draft(&self, id: Uuid) -> AppResult<bool>;

    async fn stats(&self, employee_id: Option<Uuid>, current_year: i32) -> AppResult<SalaryStats>;

    /// Every slip of one employee, optionally limited to a year
    async fn list_for_employee(
        &self,
        employee_id: Uuid,
        year: Option<i32>,
    ) -> AppResult<Vec<SalarySlip>>;
}

/// Concrete implementation of SalarySlipRepository
pub struct SalarySlipStore {
    db: DatabaseConnection,
}

impl SalarySlipStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn reload(&self, id: Uuid, rows_affected: u64) -> AppResult<Option<SalarySlip>> {
        if rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }
}

fn in_status(id: Uuid, status: SlipStatus) -> Condition {
    Condition::all()
        .add(salary_slip::Column::Id.eq(id))
        .add(salary_slip::Column::Status.eq(status.as_str()))
}

fn owner_condition(employee_id: Option<Uuid>) -> Condition {
    match employee_id {
        Some(id) => Condition::all().add(salary_slip::Column::EmployeeId.eq(id)),
        None => Condition::all(),
    }
}

fn to_domain(models: Vec<salary_slip::Model>) -> AppResult<Vec<SalarySlip>> {
    models.into_iter().map(SalarySlip::try_from).collect()
}

/// `(key, count, net sum)` as returned by a grouped slip query
type GroupedNet<K> = (K, i64, Option<Decimal>);

/// Slip count and net total per value of `key`
fn grouped_net(key: salary_slip::Column, employee_id: Option<Uuid>) -> Select<SlipEntity> {
    SlipEntity::find()
        .select_only()
        .column(key)
        .column_as(salary_slip::Column::Id.count(), "count")
        .column_as(salary_slip::Column::NetSalary.sum(), "net")
        .filter(owner_condition(employee_id))
        .group_by(key)
}

/// Assemble slip statistics from the grouped totals.
fn summarize(
    by_status: Vec<GroupedNet<String>>,
    by_year: Vec<GroupedNet<i32>>,
    by_month: Vec<GroupedNet<i32>>,
    current_year: i32,
) -> SalaryStats {
    let mut overview = SalaryOverview::default();
    for (status, count, net) in by_status {
        let count = count.max(0) as u64;
        overview.total += count;
        overview.total_net_salary += net.unwrap_or_default();
        match status.parse::<SlipStatus>() {
            Ok(SlipStatus::Draft) => overview.draft += count,
            Ok(SlipStatus::Finalized) => overview.finalized += count,
            Ok(SlipStatus::Sent) => overview.sent += count,
            Err(_) => tracing::warn!(status = %status, "Unknown slip status in stats"),
        }
    }

    let yearly: Vec<YearlyPayout> = by_year
        .into_iter()
        .map(|(year, count, net)| YearlyPayout {
            year,
            count: count.max(0) as u64,
            total_net_salary: net.unwrap_or_default(),
        })
        .collect();
    overview.current_year_net_salary = yearly
        .iter()
        .find(|payout| payout.year == current_year)
        .map(|payout| payout.total_net_salary)
        .unwrap_or_default();

    let monthly = by_month
        .into_iter()
        .filter_map(|(month, count, net)| {
            Some(MonthlyPayout {
                month: u32::try_from(month).ok()?,
                count: count.max(0) as u64,
                total_net_salary: net.unwrap_or_default(),
            })
        })
        .collect();

    SalaryStats {
        overview,
        monthly,
        yearly,
    }
}

#[async_trait]
impl SalarySlipRepository for SalarySlipStore {
    async fn create(&self, slip: NewSalarySlip) -> AppResult<SalarySlip> {
        let now = Utc::now();
        let NewSalarySlip {
            input,
            generated_by,
            breakdown,
        } = slip;

        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(input.employee_id),
            month: Set(input.period.month as i32),
            year: Set(input.period.year),
            basic_salary: Set(input.basic_salary),
            hra: Set(input.allowances.hra),
            transport_allowance: Set(input.allowances.transport),
            medical_allowance: Set(input.allowances.medical),
            special_allowance: Set(input.allowances.special),
            other_allowance: Set(input.allowances.other),
            tax: Set(input.deductions.tax),
            pf: Set(input.deductions.pf),
            insurance: Set(input.deductions.insurance),
            other_deduction: Set(input.deductions.other),
            total_days: Set(input.working_days.total),
            worked_days: Set(input.working_days.worked),
            status: Set(SlipStatus::Draft.as_str().to_string()),
            generated_by: Set(generated_by),
            gross_salary: Set(breakdown.gross_salary),
            net_salary: Set(breakdown.net_salary),
            document_path: Set(None),
            notes: Set(input.notes),
            finalized_at: Set(None),
            sent_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match active_model.insert(&self.db).await {
            Ok(model) => SalarySlip::try_from(model),
            Err(err) => match AppError::from(err) {
                AppError::Conflict(_) => Err(AppError::conflict(
                    "Salary slip already exists for this period",
                )),
                other => Err(other),
            },
        }
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SalarySlip>> {
        SlipEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(SalarySlip::try_from)
            .transpose()
    }

    async fn find_for_period(
        &self,
        employee_id: Uuid,
        period: PayPeriod,
    ) -> AppResult<Option<SalarySlip>> {
        SlipEntity::find()
            .filter(salary_slip::Column::EmployeeId.eq(employee_id))
            .filter(salary_slip::Column::Month.eq(period.month as i32))
            .filter(salary_slip::Column::Year.eq(period.year))
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(SalarySlip::try_from)
            .transpose()
    }

    async fn list(
        &self,
        filter: SlipFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<SalarySlip>, u64)> {
        let mut condition = owner_condition(filter.employee_id);
        if let Some(month) = filter.month {
            condition = condition.add(salary_slip::Column::Month.eq(month as i32));
        }
        if let Some(year) = filter.year {
            condition = condition.add(salary_slip::Column::Year.eq(year));
        }
        if let Some(status) = filter.status {
            condition = condition.add(salary_slip::Column::Status.eq(status.as_str()));
        }

        let paginator = SlipEntity::find()
            .filter(condition)
            .order_by_desc(salary_slip::Column::Year)
            .order_by_desc(salary_slip::Column::Month)
            .order_by_desc(salary_slip::Column::CreatedAt)
            .paginate(&self.db, page.limit());

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.page() - 1).await?;

        Ok((to_domain(models)?, total))
    }

    async fn update_draft(
        &self,
        id: Uuid,
        revision: SlipRevision,
    ) -> AppResult<Option<SalarySlip>> {
        let SlipRevision {
            basic_salary,
            allowances,
            deductions,
            working_days,
            notes,
            breakdown,
        } = revision;

        let result = SlipEntity::update_many()
            .col_expr(salary_slip::Column::BasicSalary, Expr::value(basic_salary))
            .col_expr(salary_slip::Column::Hra, Expr::value(allowances.hra))
            .col_expr(
                salary_slip::Column::TransportAllowance,
                Expr::value(allowances.transport),
            )
            .col_expr(
                salary_slip::Column::MedicalAllowance,
                Expr::value(allowances.medical),
            )
            .col_expr(
                salary_slip::Column::SpecialAllowance,
                Expr::value(allowances.special),
            )
            .col_expr(salary_slip::Column::OtherAllowance, Expr::value(allowances.other))
            .col_expr(salary_slip::Column::Tax, Expr::value(deductions.tax))
            .col_expr(salary_slip::Column::Pf, Expr::value(deductions.pf))
            .col_expr(salary_slip::Column::Insurance, Expr::value(deductions.insurance))
            .col_expr(salary_slip::Column::OtherDeduction, Expr::value(deductions.other))
            .col_expr(salary_slip::Column::TotalDays, Expr::value(working_days.total))
            .col_expr(salary_slip::Column::WorkedDays, Expr::value(working_days.worked))
            .col_expr(salary_slip::Column::Notes, Expr::value(notes))
            .col_expr(
                salary_slip::Column::GrossSalary,
                Expr::value(breakdown.gross_salary),
            )
            .col_expr(salary_slip::Column::NetSalary, Expr::value(breakdown.net_salary))
            .col_expr(salary_slip::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(in_status(id, SlipStatus::Draft))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        self.reload(id, result.rows_affected).await
    }

    async fn transition(
        &self,
        id: Uuid,
        from: SlipStatus,
        to: SlipStatus,
    ) -> AppResult<Option<SalarySlip>> {
        let now = Utc::now();
        let mut update = SlipEntity::update_many()
            .col_expr(salary_slip::Column::Status, Expr::value(to.as_str()))
            .col_expr(salary_slip::Column::UpdatedAt, Expr::value(now));

        match to {
            SlipStatus::Finalized => {
                update = update.col_expr(salary_slip::Column::FinalizedAt, Expr::value(now));
            }
            SlipStatus::Sent => {
                update = update.col_expr(salary_slip::Column::SentAt, Expr::value(now));
            }
            SlipStatus::Draft => {}
        }

        let result = update
            .filter(in_status(id, from))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        self.reload(id, result.rows_affected).await
    }

    async fn set_document(&self, id: Uuid, path: String) -> AppResult<Option<SalarySlip>> {
        let result = SlipEntity::update_many()
            .col_expr(salary_slip::Column::DocumentPath, Expr::value(path))
            .col_expr(salary_slip::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(salary_slip::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        self.reload(id, result.rows_affected).await
    }

    async fn delete_draft(&self, id: Uuid) -> AppResult<bool> {
        let result = SlipEntity::delete_many()
            .filter(in_status(id, SlipStatus::Draft))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected > 0)
    }

    async fn stats(&self, employee_id: Option<Uuid>, current_year: i32) -> AppResult<SalaryStats> {
        let by_status = grouped_net(salary_slip::Column::Status, employee_id)
            .into_tuple::<GroupedNet<String>>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        let by_year = grouped_net(salary_slip::Column::Year, employee_id)
            .order_by_desc(salary_slip::Column::Year)
            .into_tuple::<GroupedNet<i32>>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        let by_month = grouped_net(salary_slip::Column::Month, employee_id)
            .filter(salary_slip::Column::Year.eq(current_year))
            .order_by_asc(salary_slip::Column::Month)
            .into_tuple::<GroupedNet<i32>>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(summarize(by_status, by_year, by_month, current_year))
    }

    async fn list_for_employee(
        &self,
        employee_id: Uuid,
        year: Option<i32>,
    ) -> AppResult<Vec<SalarySlip>> {
        let mut query = SlipEntity::find().filter(salary_slip::Column::EmployeeId.eq(employee_id));
        if let Some(year) = year {
            query = query.filter(salary_slip::Column::Year.eq(year));
        }

        let models = query
            .order_by_desc(salary_slip::Column::Year)
            .order_by_desc(salary_slip::Column::Month)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        to_domain(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_stats_are_aggregated_in_sql() {
        let sql = grouped_net(salary_slip::Column::Year, Some(Uuid::nil()))
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains("GROUP BY"), "{}", sql);
        assert!(sql.contains("SUM"), "{}", sql);
        assert!(sql.contains("COUNT"), "{}", sql);
    }

    #[test]
    fn test_summarize_folds_grouped_totals() {
        let stats = summarize(
            vec![
                ("draft".to_string(), 1, Some(dec!(30000))),
                ("sent".to_string(), 2, Some(dec!(130000))),
            ],
            vec![(2024, 2, Some(dec!(95000))), (2023, 1, Some(dec!(65000)))],
            vec![(1, 1, Some(dec!(65000))), (2, 1, Some(dec!(30000)))],
            2024,
        );

        assert_eq!(stats.overview.total, 3);
        assert_eq!(stats.overview.draft, 1);
        assert_eq!(stats.overview.finalized, 0);
        assert_eq!(stats.overview.sent, 2);
        assert_eq!(stats.overview.total_net_salary, dec!(160000));
        assert_eq!(stats.overview.current_year_net_salary, dec!(95000));
        assert_eq!(stats.yearly[0].year, 2024);
        assert_eq!(stats.monthly.len(), 2);
        assert_eq!(stats.monthly[1].month, 2);
        assert_eq!(stats.monthly[1].total_net_salary, dec!(30000));
    }

    #[test]
    fn test_summarize_without_slips() {
        let stats = summarize(Vec::new(), Vec::new(), Vec::new(), 2024);
        assert_eq!(stats, SalaryStats::default());
    }
}
