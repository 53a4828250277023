//! Account service - Directory, profile and role management.
//!
//! Accounts are never removed: "delete" deactivates. Admins cannot
//! deactivate themselves or change their own role.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::account::{
    normalize_email, validate_department, validate_name, validate_position,
};
use crate::domain::{
    Account, AccountChanges, AccountFilter, AccountStats, Actor, BankDetails, BaseSalary,
    EmployeeSummary, NewAccount, Password, Role,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};

/// Admin-provided data for a new account
#[derive(Debug, Clone)]
pub struct AccountDraft {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub salary: BaseSalary,
    pub bank_details: BankDetails,
}

/// Account service trait for dependency injection.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Owner or admin
    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Account>;

    async fn list(
        &self,
        actor: &Actor,
        filter: AccountFilter,
        page: PaginationParams,
    ) -> AppResult<Paginated<Account>>;

    async fn create(&self, actor: &Actor, draft: AccountDraft) -> AppResult<Account>;

    /// Profile update; salary changes from non-admins are ignored
    async fn update(&self, actor: &Actor, id: Uuid, changes: AccountChanges)
        -> AppResult<Account>;

    async fn deactivate(&self, actor: &Actor, id: Uuid) -> AppResult<Account>;

    async fn activate(&self, actor: &Actor, id: Uuid) -> AppResult<Account>;

    async fn change_role(&self, actor: &Actor, id: Uuid, role: Role) -> AppResult<Account>;

    async fn stats(&self, actor: &Actor) -> AppResult<AccountStats>;

    /// Active employees for pickers
    async fn employees(&self, actor: &Actor) -> AppResult<Vec<EmployeeSummary>>;
}

/// Concrete implementation of AccountService using Unit of Work.
pub struct AccountManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> AccountManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn find(&self, id: Uuid) -> AppResult<Account> {
        self.uow
            .accounts()
            .find_by_id(id)
            .await?
            .ok_or_not_found("User")
    }
}

/// Field-wise merge: a provided value replaces, a missing one keeps the current.
fn merge_bank_details(current: &BankDetails, update: BankDetails) -> BankDetails {
    let update = update.normalized();
    BankDetails {
        account_number: update
            .account_number
            .or_else(|| current.account_number.clone()),
        bank_name: update.bank_name.or_else(|| current.bank_name.clone()),
        ifsc_code: update.ifsc_code.or_else(|| current.ifsc_code.clone()),
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> AccountService for AccountManager<U> {
    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Account> {
        actor.require_owner_or_admin(id)?;
        self.find(id).await
    }

    async fn list(
        &self,
        actor: &Actor,
        filter: AccountFilter,
        page: PaginationParams,
    ) -> AppResult<Paginated<Account>> {
        actor.require_admin()?;
        let (accounts, total) = self.uow.accounts().list(filter, page).await?;
        Ok(Paginated::new(accounts, page, total))
    }

    async fn create(&self, actor: &Actor, draft: AccountDraft) -> AppResult<Account> {
        actor.require_admin()?;
        draft.salary.validate()?;

        let email = normalize_email(&draft.email);
        if self.uow.accounts().find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let account = self
            .uow
            .accounts()
            .create(NewAccount {
                name: validate_name(&draft.name)?,
                email,
                password_hash: Password::new(&draft.password)?.into_string(),
                role: draft.role,
                department: validate_department(draft.department)?,
                position: validate_position(draft.position)?,
                joining_date: draft.joining_date,
                salary: draft.salary,
                bank_details: draft.bank_details.normalized(),
            })
            .await?;

        tracing::info!(
            account_id = %account.id,
            role = %account.role,
            created_by = %actor.id,
            "Account created"
        );
        Ok(account)
    }

    async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: AccountChanges,
    ) -> AppResult<Account> {
        actor.require_owner_or_admin(id)?;
        let current = self.find(id).await?;

        let email = match changes.email {
            Some(email) => {
                let email = normalize_email(&email);
                if email != current.email
                    && self.uow.accounts().find_by_email(&email).await?.is_some()
                {
                    return Err(AppError::conflict("Email is already taken"));
                }
                Some(email)
            }
            None => None,
        };

        let salary = match changes.salary {
            Some(salary) if actor.is_admin() => {
                salary.validate()?;
                Some(salary)
            }
            Some(_) => {
                tracing::debug!(account_id = %id, "Ignoring salary change from non-admin");
                None
            }
            None => None,
        };

        let changes = AccountChanges {
            name: changes.name.as_deref().map(validate_name).transpose()?,
            email,
            department: validate_department(changes.department)?,
            position: validate_position(changes.position)?,
            salary,
            bank_details: changes
                .bank_details
                .map(|update| merge_bank_details(&current.bank_details, update)),
        };

        if changes.is_empty() {
            return Ok(current);
        }

        let updated = self.uow.accounts().update_profile(id, changes).await?;
        tracing::info!(account_id = %id, updated_by = %actor.id, "Account updated");
        Ok(updated)
    }

    async fn deactivate(&self, actor: &Actor, id: Uuid) -> AppResult<Account> {
        actor.require_admin()?;
        if actor.id == id {
            return Err(AppError::bad_request("You cannot deactivate your own account"));
        }
        self.find(id).await?;

        let account = self.uow.accounts().set_active(id, false).await?;
        tracing::info!(account_id = %id, by = %actor.id, "Account deactivated");
        Ok(account)
    }

    async fn activate(&self, actor: &Actor, id: Uuid) -> AppResult<Account> {
        actor.require_admin()?;
        self.find(id).await?;

        let account = self.uow.accounts().set_active(id, true).await?;
        tracing::info!(account_id = %id, by = %actor.id, "Account activated");
        Ok(account)
    }

    async fn change_role(&self, actor: &Actor, id: Uuid, role: Role) -> AppResult<Account> {
        actor.require_admin()?;
        if actor.id == id {
            return Err(AppError::bad_request("You cannot change your own role"));
        }
        let current = self.find(id).await?;
        if current.role == role {
            return Ok(current);
        }

        let account = self.uow.accounts().set_role(id, role).await?;
        tracing::info!(account_id = %id, role = %role, by = %actor.id, "Role changed");
        Ok(account)
    }

    async fn stats(&self, actor: &Actor) -> AppResult<AccountStats> {
        actor.require_admin()?;
        self.uow.accounts().stats().await
    }

    async fn employees(&self, actor: &Actor) -> AppResult<Vec<EmployeeSummary>> {
        actor.require_admin()?;
        let employees = self.uow.accounts().list_active_employees().await?;
        Ok(employees.into_iter().map(EmployeeSummary::from).collect())
    }
}
