//! Account repository: identity, role and compensation records.
//!
//! Accounts are deactivated, never deleted. Employee codes are issued from
//! the count of codes already handed out and protected by a unique index;
//! a collision from a concurrent insert is retried.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use super::entities::account::{self, ActiveModel, Entity as AccountEntity};
use crate::domain::{
    account::employee_code, Account, AccountChanges, AccountFilter, AccountStats,
    DepartmentCount, NewAccount, Role,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Attempts at issuing a fresh employee code before giving up.
const EMPLOYEE_CODE_ATTEMPTS: u32 = 3;

/// Account repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Lookup by normalised (lower-case) email
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Insert an account; employees get the next employee code
    async fn create(&self, account: NewAccount) -> AppResult<Account>;

    async fn update_profile(&self, id: Uuid, changes: AccountChanges) -> AppResult<Account>;

    async fn set_password(&self, id: Uuid, password_hash: String) -> AppResult<()>;

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Account>;

    /// Change role; becoming an employee issues a code if the account has none
    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Account>;

    async fn touch_last_login(&self, id: Uuid) -> AppResult<()>;

    /// Filtered page, newest first, with the total match count
    async fn list(
        &self,
        filter: AccountFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Account>, u64)>;

    /// Ids of active accounts, optionally restricted to one role
    async fn active_ids(&self, role: Option<Role>) -> AppResult<Vec<Uuid>>;

    /// Active employees ordered by name
    async fn list_active_employees(&self) -> AppResult<Vec<Account>>;

    async fn stats(&self) -> AppResult<AccountStats>;
}

/// Concrete implementation of AccountRepository
pub struct AccountStore {
    db: DatabaseConnection,
}

impl AccountStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: Uuid) -> AppResult<account::Model> {
        AccountEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .ok_or_not_found("Account")
    }

    async fn email_taken(&self, email: &str) -> AppResult<bool> {
        Ok(AccountEntity::find()
            .filter(account::Column::Email.eq(email))
            .count(&self.db)
            .await?
            > 0)
    }

    /// Insert inside a transaction so the code count and the insert see the same snapshot.
    async fn insert_once(&self, account: &NewAccount) -> Result<account::Model, DbErr> {
        let txn = self.db.begin().await?;

        let code = match account.role {
            Role::Employee => Some(next_employee_code(&txn).await?),
            Role::Admin => None,
        };

        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(account.name.clone()),
            email: Set(account.email.clone()),
            password_hash: Set(account.password_hash.clone()),
            role: Set(account.role.as_str().to_string()),
            employee_code: Set(code),
            department: Set(account.department.clone()),
            position: Set(account.position.clone()),
            joining_date: Set(account.joining_date.unwrap_or_else(|| now.date_naive())),
            basic_salary: Set(account.salary.basic),
            allowances: Set(account.salary.allowances),
            bank_account_number: Set(account.bank_details.account_number.clone()),
            bank_name: Set(account.bank_details.bank_name.clone()),
            ifsc_code: Set(account.bank_details.ifsc_code.clone()),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match active_model.insert(&txn).await {
            Ok(model) => {
                txn.commit().await?;
                Ok(model)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn promote_once(&self, id: Uuid, role: Role) -> Result<Option<account::Model>, DbErr> {
        let txn = self.db.begin().await?;

        let Some(model) = AccountEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let needs_code = role == Role::Employee && model.employee_code.is_none();
        let mut active: ActiveModel = model.into();
        active.role = Set(role.as_str().to_string());
        if needs_code {
            active.employee_code = Set(Some(next_employee_code(&txn).await?));
        }
        active.updated_at = Set(Utc::now());

        match active.update(&txn).await {
            Ok(updated) => {
                txn.commit().await?;
                Ok(Some(updated))
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

async fn next_employee_code<C: ConnectionTrait>(conn: &C) -> Result<String, DbErr> {
    let issued = AccountEntity::find()
        .filter(account::Column::EmployeeCode.is_not_null())
        .count(conn)
        .await?;
    Ok(employee_code(issued + 1))
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn email_conflict() -> AppError {
    AppError::conflict("An account with this email already exists")
}

const LIKE_ESCAPE: char = '\\';

/// Lower-cased `%term%` with the term's own wildcards escaped
fn like_term(term: &str) -> String {
    let mut pattern = String::from("%");
    for c in term.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match for a user-supplied search term
pub(crate) fn like_pattern(term: &str) -> LikeExpr {
    LikeExpr::new(like_term(term)).escape(LIKE_ESCAPE)
}

fn lower_like(column: account::Column, pattern: &LikeExpr) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(pattern.clone())
}

fn filter_condition(filter: &AccountFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(role) = filter.role {
        condition = condition.add(account::Column::Role.eq(role.as_str()));
    }
    if let Some(department) = &filter.department {
        condition = condition.add(account::Column::Department.eq(department.as_str()));
    }
    if let Some(active) = filter.is_active {
        condition = condition.add(account::Column::IsActive.eq(active));
    }
    if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
        let pattern = like_pattern(term);
        condition = condition.add(
            Condition::any()
                .add(lower_like(account::Column::Name, &pattern))
                .add(lower_like(account::Column::Email, &pattern))
                .add(lower_like(account::Column::EmployeeCode, &pattern)),
        );
    }

    condition
}

fn into_accounts(models: Vec<account::Model>) -> AppResult<Vec<Account>> {
    models.into_iter().map(Account::try_from).collect()
}

#[async_trait]
impl AccountRepository for AccountStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        let result = AccountEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        result.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let result = AccountEntity::find()
            .filter(account::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        result.map(Account::try_from).transpose()
    }

    async fn create(&self, account: NewAccount) -> AppResult<Account> {
        for attempt in 1..=EMPLOYEE_CODE_ATTEMPTS {
            match self.insert_once(&account).await {
                Ok(model) => return Account::try_from(model),
                Err(e) if is_unique_violation(&e) => {
                    if self.email_taken(&account.email).await? {
                        return Err(email_conflict());
                    }
                    tracing::debug!(attempt, "Employee code collision, retrying");
                }
                Err(e) => return Err(AppError::from(e)),
            }
        }

        Err(AppError::conflict("Could not allocate a unique employee code"))
    }

    async fn update_profile(&self, id: Uuid, changes: AccountChanges) -> AppResult<Account> {
        let model = self.find_model(id).await?;
        let mut active: ActiveModel = model.into();

        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(department) = changes.department {
            active.department = Set(Some(department));
        }
        if let Some(position) = changes.position {
            active.position = Set(Some(position));
        }
        if let Some(salary) = changes.salary {
            active.basic_salary = Set(salary.basic);
            active.allowances = Set(salary.allowances);
        }
        if let Some(bank) = changes.bank_details {
            active.bank_account_number = Set(bank.account_number);
            active.bank_name = Set(bank.bank_name);
            active.ifsc_code = Set(bank.ifsc_code);
        }
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(model) => Account::try_from(model),
            Err(e) if is_unique_violation(&e) => Err(email_conflict()),
            Err(e) => Err(AppError::from(e)),
        }
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        let result = AccountEntity::update_many()
            .col_expr(account::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(account::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Account"));
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active_flag: bool) -> AppResult<Account> {
        let model = self.find_model(id).await?;
        let mut active: ActiveModel = model.into();
        active.is_active = Set(active_flag);
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Account::try_from(model)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Account> {
        for attempt in 1..=EMPLOYEE_CODE_ATTEMPTS {
            match self.promote_once(id, role).await {
                Ok(Some(model)) => return Account::try_from(model),
                Ok(None) => return Err(AppError::NotFound("Account")),
                Err(e) if is_unique_violation(&e) => {
                    tracing::debug!(attempt, account_id = %id, "Employee code collision, retrying");
                }
                Err(e) => return Err(AppError::from(e)),
            }
        }

        Err(AppError::conflict("Could not allocate a unique employee code"))
    }

    async fn touch_last_login(&self, id: Uuid) -> AppResult<()> {
        AccountEntity::update_many()
            .col_expr(account::Column::LastLoginAt, Expr::value(Some(Utc::now())))
            .filter(account::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn list(
        &self,
        filter: AccountFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Account>, u64)> {
        let paginator = AccountEntity::find()
            .filter(filter_condition(&filter))
            .order_by_desc(account::Column::CreatedAt)
            .paginate(&self.db, page.limit());

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.page() - 1).await?;

        Ok((into_accounts(models)?, total))
    }

    async fn active_ids(&self, role: Option<Role>) -> AppResult<Vec<Uuid>> {
        let mut query = AccountEntity::find()
            .select_only()
            .column(account::Column::Id)
            .filter(account::Column::IsActive.eq(true));

        if let Some(role) = role {
            query = query.filter(account::Column::Role.eq(role.as_str()));
        }

        let ids = query
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(ids)
    }

    async fn list_active_employees(&self) -> AppResult<Vec<Account>> {
        let models = AccountEntity::find()
            .filter(account::Column::Role.eq(Role::Employee.as_str()))
            .filter(account::Column::IsActive.eq(true))
            .order_by_asc(account::Column::Name)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        into_accounts(models)
    }

    async fn stats(&self) -> AppResult<AccountStats> {
        let count = |condition: Condition| {
            AccountEntity::find().filter(condition).count(&self.db)
        };

        let total_users = count(Condition::all()).await?;
        let active_users = count(Condition::all().add(account::Column::IsActive.eq(true))).await?;
        let total_employees =
            count(Condition::all().add(account::Column::Role.eq(Role::Employee.as_str()))).await?;
        let total_admins =
            count(Condition::all().add(account::Column::Role.eq(Role::Admin.as_str()))).await?;

        let since = (Utc::now() - Duration::days(30)).date_naive();
        let recent_joinings =
            count(Condition::all().add(account::Column::JoiningDate.gte(since))).await?;

        let departments = AccountEntity::find()
            .select_only()
            .column(account::Column::Department)
            .column_as(account::Column::Id.count(), "count")
            .filter(account::Column::Department.is_not_null())
            .group_by(account::Column::Department)
            .order_by_asc(account::Column::Department)
            .into_tuple::<(String, i64)>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .map(|(department, count)| DepartmentCount {
                department,
                count: count.max(0) as u64,
            })
            .collect();

        Ok(AccountStats {
            total_users,
            active_users,
            inactive_users: total_users.saturating_sub(active_users),
            total_employees,
            total_admins,
            recent_joinings,
            departments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_term_is_lowercase_and_wrapped() {
        assert_eq!(like_term("  Asha "), "%asha%");
    }

    #[test]
    fn test_like_term_escapes_wildcards() {
        assert_eq!(like_term("50%"), r"%50\%%");
        assert_eq!(like_term("emp_01"), r"%emp\_01%");
        assert_eq!(like_term(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn test_search_sql_declares_escape_character() {
        use sea_orm::{DbBackend, QueryTrait};

        let filter = AccountFilter {
            search: Some("50%".to_string()),
            ..AccountFilter::default()
        };
        let sql = AccountEntity::find()
            .filter(filter_condition(&filter))
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains("LIKE"), "{}", sql);
        assert!(sql.contains("ESCAPE"), "{}", sql);
    }

    #[test]
    fn test_unique_violation_detection_ignores_other_errors() {
        assert!(!is_unique_violation(&DbErr::RecordNotFound(
            "missing".to_string()
        )));
    }
}
