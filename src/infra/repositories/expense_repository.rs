//! Expense repository with atomic status transitions.
//!
//! Every mutation of a claim's content or status is a single conditional
//! `UPDATE … WHERE id = ? AND status = 'pending'`. Zero affected rows means the
//! precondition no longer held and the caller gets `None`/`false` back.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, LoaderTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Value,
};
use uuid::Uuid;

use super::account_repository::like_pattern;
use super::entities::expense::{self, ActiveModel, Entity as ExpenseEntity};
use super::entities::expense_comment::{self, Entity as CommentEntity};
use crate::domain::expense::{CategoryTotal, ExpenseOverview, MonthlyExpenseTotal};
use crate::domain::{
    Expense, ExpenseCategory, ExpenseChanges, ExpenseComment, ExpenseDecision, ExpenseFilter,
    ExpenseStats, ExpenseStatus, NewExpense,
};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Expense repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Insert a new claim in `pending`
    async fn create(&self, expense: NewExpense) -> AppResult<Expense>;

    /// Claim with its comment thread
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Expense>>;

    /// Filtered page, newest first, with the total match count
    async fn list(
        &self,
        filter: ExpenseFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Expense>, u64)>;

    /// Apply content changes if the claim is still pending
    async fn update_pending(&self, id: Uuid, changes: ExpenseChanges)
        -> AppResult<Option<Expense>>;

    /// Record a decision if the claim is still pending
    async fn decide(
        &self,
        id: Uuid,
        decision: ExpenseDecision,
        decided_by: Uuid,
        decided_at: DateTime<Utc>,
    ) -> AppResult<Option<Expense>>;

    /// Delete if still pending; `false` when nothing was deleted
    async fn delete_pending(&self, id: Uuid) -> AppResult<bool>;

    async fn add_comment(
        &self,
        expense_id: Uuid,
        author_id: Uuid,
        message: String,
    ) -> AppResult<ExpenseComment>;

    /// Totals for one owner (or everyone), monthly figures for `year`
    async fn stats(&self, employee_id: Option<Uuid>, year: i32) -> AppResult<ExpenseStats>;
}

/// Concrete implementation of ExpenseRepository
pub struct ExpenseStore {
    db: DatabaseConnection,
}

impl ExpenseStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn with_comments(&self, models: Vec<expense::Model>) -> AppResult<Vec<Expense>> {
        let comments = models
            .load_many(CommentEntity, &self.db)
            .await
            .map_err(AppError::from)?;

        models
            .into_iter()
            .zip(comments)
            .map(|(model, comments)| model.into_domain(comments))
            .collect()
    }
}

fn pending(id: Uuid) -> Condition {
    Condition::all()
        .add(expense::Column::Id.eq(id))
        .add(expense::Column::Status.eq(ExpenseStatus::Pending.as_str()))
}

fn owner_condition(employee_id: Option<Uuid>) -> Condition {
    match employee_id {
        Some(id) => Condition::all().add(expense::Column::EmployeeId.eq(id)),
        None => Condition::all(),
    }
}

fn filter_condition(filter: &ExpenseFilter) -> Condition {
    let mut condition = owner_condition(filter.employee_id);

    if let Some(status) = filter.status {
        condition = condition.add(expense::Column::Status.eq(status.as_str()));
    }
    if let Some(category) = filter.category {
        condition = condition.add(expense::Column::Category.eq(category.as_str()));
    }
    if let Some(start) = filter.start_date {
        condition = condition.add(expense::Column::ExpenseDate.gte(start));
    }
    if let Some(end) = filter.end_date {
        condition = condition.add(expense::Column::ExpenseDate.lte(end));
    }
    if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
        let pattern = like_pattern(term);
        condition = condition.add(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(expense::Column::Title)))
                        .like(pattern.clone()),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col(expense::Column::Description)))
                        .like(pattern),
                ),
        );
    }

    condition
}

fn year_bounds(year: i32) -> AppResult<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    start
        .zip(end)
        .ok_or_else(|| AppError::validation(format!("Invalid year {}", year)))
}

#[async_trait]
impl ExpenseRepository for ExpenseStore {
    async fn create(&self, expense: NewExpense) -> AppResult<Expense> {
        let now = Utc::now();
        let receipt = expense.receipt;
        let draft = expense.draft;

        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(expense.employee_id),
            title: Set(draft.title),
            description: Set(draft.description),
            amount: Set(draft.amount),
            category: Set(draft.category.as_str().to_string()),
            expense_date: Set(draft.expense_date),
            status: Set(ExpenseStatus::Pending.as_str().to_string()),
            approved_by: Set(None),
            approved_at: Set(None),
            rejection_reason: Set(None),
            receipt_filename: Set(receipt.as_ref().map(|r| r.filename.clone())),
            receipt_original_name: Set(receipt.as_ref().map(|r| r.original_name.clone())),
            receipt_path: Set(receipt.as_ref().map(|r| r.path.clone())),
            receipt_size: Set(receipt.as_ref().map(|r| r.size)),
            receipt_mime_type: Set(receipt.as_ref().map(|r| r.mime_type.clone())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        model.into_domain(Vec::new())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Expense>> {
        let Some(model) = ExpenseEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?
        else {
            return Ok(None);
        };

        let comments = CommentEntity::find()
            .filter(expense_comment::Column::ExpenseId.eq(id))
            .order_by_asc(expense_comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        model.into_domain(comments).map(Some)
    }

    async fn list(
        &self,
        filter: ExpenseFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Expense>, u64)> {
        let paginator = ExpenseEntity::find()
            .filter(filter_condition(&filter))
            .order_by_desc(expense::Column::CreatedAt)
            .paginate(&self.db, page.limit());

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.page() - 1).await?;

        Ok((self.with_comments(models).await?, total))
    }

    async fn update_pending(
        &self,
        id: Uuid,
        changes: ExpenseChanges,
    ) -> AppResult<Option<Expense>> {
        let mut update = ExpenseEntity::update_many()
            .col_expr(expense::Column::UpdatedAt, Expr::value(Utc::now()));

        if let Some(title) = changes.title {
            update = update.col_expr(expense::Column::Title, Expr::value(title));
        }
        if let Some(description) = changes.description {
            update = update.col_expr(expense::Column::Description, Expr::value(description));
        }
        if let Some(amount) = changes.amount {
            update = update.col_expr(expense::Column::Amount, Expr::value(amount));
        }
        if let Some(category) = changes.category {
            update = update.col_expr(expense::Column::Category, Expr::value(category.as_str()));
        }
        if let Some(date) = changes.expense_date {
            update = update.col_expr(expense::Column::ExpenseDate, Expr::value(date));
        }

        let result = update
            .filter(pending(id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn decide(
        &self,
        id: Uuid,
        decision: ExpenseDecision,
        decided_by: Uuid,
        decided_at: DateTime<Utc>,
    ) -> AppResult<Option<Expense>> {
        let reason = match decision.reason() {
            Some(reason) => Value::from(reason.to_string()),
            None => Value::String(None),
        };

        let result = ExpenseEntity::update_many()
            .col_expr(
                expense::Column::Status,
                Expr::value(decision.status().as_str()),
            )
            .col_expr(expense::Column::ApprovedBy, Expr::value(decided_by))
            .col_expr(expense::Column::ApprovedAt, Expr::value(decided_at))
            .col_expr(expense::Column::RejectionReason, Expr::value(reason))
            .col_expr(expense::Column::UpdatedAt, Expr::value(decided_at))
            .filter(pending(id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete_pending(&self, id: Uuid) -> AppResult<bool> {
        let result = ExpenseEntity::delete_many()
            .filter(pending(id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected > 0)
    }

    async fn add_comment(
        &self,
        expense_id: Uuid,
        author_id: Uuid,
        message: String,
    ) -> AppResult<ExpenseComment> {
        let active_model = expense_comment::ActiveModel {
            id: Set(Uuid::new_v4()),
            expense_id: Set(expense_id),
            author_id: Set(author_id),
            message: Set(message),
            created_at: Set(Utc::now()),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(ExpenseComment::from(model))
    }

    async fn stats(&self, employee_id: Option<Uuid>, year: i32) -> AppResult<ExpenseStats> {
        let by_status = ExpenseEntity::find()
            .select_only()
            .column(expense::Column::Status)
            .column_as(expense::Column::Id.count(), "count")
            .column_as(expense::Column::Amount.sum(), "amount")
            .filter(owner_condition(employee_id))
            .group_by(expense::Column::Status)
            .into_tuple::<(String, i64, Option<Decimal>)>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        let mut overview = ExpenseOverview::default();
        for (status, count, amount) in by_status {
            let count = count.max(0) as u64;
            let amount = amount.unwrap_or_default();
            overview.total += count;
            overview.total_amount += amount;
            match status.parse::<ExpenseStatus>() {
                Ok(ExpenseStatus::Pending) => overview.pending += count,
                Ok(ExpenseStatus::Approved) => {
                    overview.approved += count;
                    overview.approved_amount += amount;
                }
                Ok(ExpenseStatus::Rejected) => overview.rejected += count,
                Err(_) => tracing::warn!(status = %status, "Unknown expense status in stats"),
            }
        }

        let categories = ExpenseEntity::find()
            .select_only()
            .column(expense::Column::Category)
            .column_as(expense::Column::Id.count(), "count")
            .column_as(expense::Column::Amount.sum(), "amount")
            .filter(owner_condition(employee_id))
            .group_by(expense::Column::Category)
            .into_tuple::<(String, i64, Option<Decimal>)>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .filter_map(|(category, count, amount)| {
                let category = category.parse::<ExpenseCategory>().ok()?;
                Some(CategoryTotal {
                    category,
                    count: count.max(0) as u64,
                    amount: amount.unwrap_or_default(),
                })
            })
            .collect();

        let (start, end) = year_bounds(year)?;
        let dated = ExpenseEntity::find()
            .select_only()
            .column(expense::Column::ExpenseDate)
            .column(expense::Column::Amount)
            .filter(owner_condition(employee_id))
            .filter(expense::Column::ExpenseDate.between(start, end))
            .into_tuple::<(NaiveDate, Decimal)>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        let mut months: BTreeMap<u32, (u64, Decimal)> = BTreeMap::new();
        for (date, amount) in dated {
            let entry = months.entry(date.month()).or_default();
            entry.0 += 1;
            entry.1 += amount;
        }
        let monthly = months
            .into_iter()
            .map(|(month, (count, amount))| MonthlyExpenseTotal {
                month,
                count,
                amount,
            })
            .collect();

        Ok(ExpenseStats {
            overview,
            monthly,
            categories,
        })
    }
}
