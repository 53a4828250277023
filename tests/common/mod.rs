//! In-memory infrastructure shared by the integration tests.
//!
//! Every repository keeps its rows in a `Mutex<Vec<_>>` and honours the same
//! conditional-update contracts as the SeaORM stores, so services can be
//! driven end to end without PostgreSQL.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use payroll_api::config::Config;
use payroll_api::domain::account::employee_code;
use payroll_api::domain::{
    Account, AccountChanges, AccountFilter, AccountStats, Expense, ExpenseChanges, ExpenseComment,
    ExpenseDecision, ExpenseFilter, ExpenseStats, ExpenseStatus, NewAccount, NewExpense,
    NewNotification, NewSalarySlip, Notification, NotificationFilter, NotificationStats,
    PayPeriod, Role, SalarySlip, SalaryStats, SlipFilter, SlipRevision, SlipStatus,
};
use payroll_api::errors::{AppError, AppResult};
use payroll_api::infra::{
    AccountRepository, ExpenseRepository, FileStore, Mailer, NotificationRepository,
    SalarySlipRepository, UnitOfWork,
};
use payroll_api::jobs::EmailJob;
use payroll_api::render::PdfRenderer;
use payroll_api::services::Services;
use payroll_api::types::PaginationParams;

fn paginate<T: Clone>(rows: &[T], page: PaginationParams) -> (Vec<T>, u64) {
    let items = rows
        .iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    (items, rows.len() as u64)
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Default)]
pub struct MemoryAccounts {
    rows: Mutex<Vec<Account>>,
}

impl MemoryAccounts {
    fn with<T>(&self, id: Uuid, f: impl FnOnce(&mut Account) -> T) -> AppResult<T> {
        let mut rows = self.rows.lock().unwrap();
        let account = rows
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppError::NotFound("User"))?;
        let result = f(&mut *account);
        account.updated_at = Utc::now();
        Ok(result)
    }

    fn next_code(rows: &[Account]) -> String {
        let issued = rows.iter().filter(|a| a.employee_code.is_some()).count() as u64;
        employee_code(issued + 1)
    }
}

#[async_trait]
impl AccountRepository for MemoryAccounts {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.rows.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn create(&self, account: NewAccount) -> AppResult<Account> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|a| a.email == account.email) {
            return Err(AppError::conflict("Record already exists"));
        }
        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            employee_code: (account.role == Role::Employee).then(|| Self::next_code(&rows)),
            department: account.department,
            position: account.position,
            joining_date: account.joining_date.unwrap_or_else(|| now.date_naive()),
            salary: account.salary,
            bank_details: account.bank_details,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update_profile(&self, id: Uuid, changes: AccountChanges) -> AppResult<Account> {
        self.with(id, |a| {
            if let Some(name) = changes.name {
                a.name = name;
            }
            if let Some(email) = changes.email {
                a.email = email;
            }
            if changes.department.is_some() {
                a.department = changes.department;
            }
            if changes.position.is_some() {
                a.position = changes.position;
            }
            if let Some(salary) = changes.salary {
                a.salary = salary;
            }
            if let Some(bank) = changes.bank_details {
                a.bank_details = bank;
            }
            a.clone()
        })
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        self.with(id, |a| a.password_hash = password_hash)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Account> {
        self.with(id, |a| {
            a.is_active = active;
            a.clone()
        })
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Account> {
        let code = {
            let rows = self.rows.lock().unwrap();
            Self::next_code(&rows)
        };
        self.with(id, |a| {
            a.role = role;
            if role == Role::Employee && a.employee_code.is_none() {
                a.employee_code = Some(code);
            }
            a.clone()
        })
    }

    async fn touch_last_login(&self, id: Uuid) -> AppResult<()> {
        self.with(id, |a| a.last_login_at = Some(Utc::now()))
    }

    async fn list(
        &self,
        filter: AccountFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Account>, u64)> {
        let rows = self.rows.lock().unwrap();
        let search = filter.search.map(|s| s.to_lowercase());
        let mut matching: Vec<Account> = rows
            .iter()
            .filter(|a| filter.role.map_or(true, |r| a.role == r))
            .filter(|a| filter.is_active.map_or(true, |v| a.is_active == v))
            .filter(|a| {
                filter
                    .department
                    .as_ref()
                    .map_or(true, |d| a.department.as_ref() == Some(d))
            })
            .filter(|a| {
                search.as_ref().map_or(true, |s| {
                    a.name.to_lowercase().contains(s) || a.email.contains(s)
                })
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(&matching, page))
    }

    async fn active_ids(&self, role: Option<Role>) -> AppResult<Vec<Uuid>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.is_active && role.map_or(true, |r| a.role == r))
            .map(|a| a.id)
            .collect())
    }

    async fn list_active_employees(&self) -> AppResult<Vec<Account>> {
        let mut employees: Vec<Account> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.is_active && a.role == Role::Employee)
            .cloned()
            .collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(employees)
    }

    async fn stats(&self) -> AppResult<AccountStats> {
        let rows = self.rows.lock().unwrap();
        let active = rows.iter().filter(|a| a.is_active).count() as u64;
        let employees = rows.iter().filter(|a| a.role == Role::Employee).count() as u64;
        Ok(AccountStats {
            total_users: rows.len() as u64,
            active_users: active,
            inactive_users: rows.len() as u64 - active,
            total_employees: employees,
            total_admins: rows.len() as u64 - employees,
            ..AccountStats::default()
        })
    }
}

// =============================================================================
// Expenses
// =============================================================================

#[derive(Default)]
pub struct MemoryExpenses {
    rows: Mutex<Vec<Expense>>,
}

impl MemoryExpenses {
    fn update_if_pending(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Expense),
    ) -> AppResult<Option<Expense>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows
            .iter_mut()
            .find(|e| e.id == id && e.status == ExpenseStatus::Pending)
            .map(|e| {
                f(&mut *e);
                e.updated_at = Utc::now();
                e.clone()
            }))
    }
}

#[async_trait]
impl ExpenseRepository for MemoryExpenses {
    async fn create(&self, expense: NewExpense) -> AppResult<Expense> {
        let now = Utc::now();
        let created = Expense {
            id: Uuid::new_v4(),
            employee_id: expense.employee_id,
            title: expense.draft.title,
            description: expense.draft.description,
            amount: expense.draft.amount,
            category: expense.draft.category,
            expense_date: expense.draft.expense_date,
            status: ExpenseStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            receipt: expense.receipt,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Expense>> {
        Ok(self.rows.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    async fn list(
        &self,
        filter: ExpenseFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Expense>, u64)> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<Expense> = rows
            .iter()
            .filter(|e| filter.employee_id.map_or(true, |id| e.employee_id == id))
            .filter(|e| filter.status.map_or(true, |s| e.status == s))
            .filter(|e| filter.category.map_or(true, |c| e.category == c))
            .filter(|e| filter.start_date.map_or(true, |d| e.expense_date >= d))
            .filter(|e| filter.end_date.map_or(true, |d| e.expense_date <= d))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(&matching, page))
    }

    async fn update_pending(
        &self,
        id: Uuid,
        changes: ExpenseChanges,
    ) -> AppResult<Option<Expense>> {
        self.update_if_pending(id, |e| {
            if let Some(title) = changes.title {
                e.title = title;
            }
            if let Some(description) = changes.description {
                e.description = description;
            }
            if let Some(amount) = changes.amount {
                e.amount = amount;
            }
            if let Some(category) = changes.category {
                e.category = category;
            }
            if let Some(date) = changes.expense_date {
                e.expense_date = date;
            }
        })
    }

    async fn decide(
        &self,
        id: Uuid,
        decision: ExpenseDecision,
        decided_by: Uuid,
        decided_at: DateTime<Utc>,
    ) -> AppResult<Option<Expense>> {
        self.update_if_pending(id, |e| {
            e.status = decision.status();
            e.approved_by = Some(decided_by);
            e.approved_at = Some(decided_at);
            e.rejection_reason = decision.reason().map(str::to_string);
        })
    }

    async fn delete_pending(&self, id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|e| !(e.id == id && e.status == ExpenseStatus::Pending));
        Ok(rows.len() < before)
    }

    async fn add_comment(
        &self,
        expense_id: Uuid,
        author_id: Uuid,
        message: String,
    ) -> AppResult<ExpenseComment> {
        let comment = ExpenseComment {
            id: Uuid::new_v4(),
            expense_id,
            author_id,
            message,
            created_at: Utc::now(),
        };
        let mut rows = self.rows.lock().unwrap();
        let expense = rows
            .iter_mut()
            .find(|e| e.id == expense_id)
            .ok_or(AppError::NotFound("Expense"))?;
        expense.comments.push(comment.clone());
        Ok(comment)
    }

    async fn stats(&self, _employee_id: Option<Uuid>, _year: i32) -> AppResult<ExpenseStats> {
        Ok(ExpenseStats::default())
    }
}

// =============================================================================
// Salary slips
// =============================================================================

#[derive(Default)]
pub struct MemorySalarySlips {
    rows: Mutex<Vec<SalarySlip>>,
}

impl MemorySalarySlips {
    fn update_where(
        &self,
        id: Uuid,
        status: Option<SlipStatus>,
        f: impl FnOnce(&mut SalarySlip),
    ) -> Option<SalarySlip> {
        let mut rows = self.rows.lock().unwrap();
        rows.iter_mut()
            .find(|s| s.id == id && status.map_or(true, |st| s.status == st))
            .map(|s| {
                f(&mut *s);
                s.updated_at = Utc::now();
                s.clone()
            })
    }
}

#[async_trait]
impl SalarySlipRepository for MemorySalarySlips {
    async fn create(&self, slip: NewSalarySlip) -> AppResult<SalarySlip> {
        let mut rows = self.rows.lock().unwrap();
        let input = slip.input;
        if rows.iter().any(|s| {
            s.employee_id == input.employee_id
                && s.month == input.period.month
                && s.year == input.period.year
        }) {
            return Err(AppError::conflict("Record already exists"));
        }
        let now = Utc::now();
        let created = SalarySlip {
            id: Uuid::new_v4(),
            employee_id: input.employee_id,
            month: input.period.month,
            year: input.period.year,
            basic_salary: input.basic_salary,
            allowances: input.allowances,
            deductions: input.deductions,
            working_days: input.working_days,
            status: SlipStatus::Draft,
            generated_by: slip.generated_by,
            gross_salary: slip.breakdown.gross_salary,
            net_salary: slip.breakdown.net_salary,
            document_path: None,
            notes: input.notes,
            finalized_at: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SalarySlip>> {
        Ok(self.rows.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn find_for_period(
        &self,
        employee_id: Uuid,
        period: PayPeriod,
    ) -> AppResult<Option<SalarySlip>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| {
                s.employee_id == employee_id && s.month == period.month && s.year == period.year
            })
            .cloned())
    }

    async fn list(
        &self,
        filter: SlipFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<SalarySlip>, u64)> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<SalarySlip> = rows
            .iter()
            .filter(|s| filter.employee_id.map_or(true, |id| s.employee_id == id))
            .filter(|s| filter.month.map_or(true, |m| s.month == m))
            .filter(|s| filter.year.map_or(true, |y| s.year == y))
            .filter(|s| filter.status.map_or(true, |st| s.status == st))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        Ok(paginate(&matching, page))
    }

    async fn update_draft(
        &self,
        id: Uuid,
        revision: SlipRevision,
    ) -> AppResult<Option<SalarySlip>> {
        Ok(self.update_where(id, Some(SlipStatus::Draft), |s| {
            s.basic_salary = revision.basic_salary;
            s.allowances = revision.allowances;
            s.deductions = revision.deductions;
            s.working_days = revision.working_days;
            s.notes = revision.notes;
            s.gross_salary = revision.breakdown.gross_salary;
            s.net_salary = revision.breakdown.net_salary;
        }))
    }

    async fn transition(
        &self,
        id: Uuid,
        from: SlipStatus,
        to: SlipStatus,
    ) -> AppResult<Option<SalarySlip>> {
        Ok(self.update_where(id, Some(from), |s| {
            s.status = to;
            match to {
                SlipStatus::Finalized => s.finalized_at = Some(Utc::now()),
                SlipStatus::Sent => s.sent_at = Some(Utc::now()),
                SlipStatus::Draft => {}
            }
        }))
    }

    async fn set_document(&self, id: Uuid, path: String) -> AppResult<Option<SalarySlip>> {
        Ok(self.update_where(id, None, |s| s.document_path = Some(path)))
    }

    async fn delete_draft(&self, id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|s| !(s.id == id && s.status == SlipStatus::Draft));
        Ok(rows.len() < before)
    }

    async fn stats(&self, _employee_id: Option<Uuid>, _year: i32) -> AppResult<SalaryStats> {
        Ok(SalaryStats::default())
    }

    async fn list_for_employee(
        &self,
        employee_id: Uuid,
        year: Option<i32>,
    ) -> AppResult<Vec<SalarySlip>> {
        let (slips, _) = self
            .list(
                SlipFilter {
                    employee_id: Some(employee_id),
                    year,
                    ..SlipFilter::default()
                },
                PaginationParams::new(1, 100),
            )
            .await?;
        Ok(slips)
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Default)]
pub struct MemoryNotifications {
    rows: Mutex<Vec<Notification>>,
}

impl MemoryNotifications {
    pub fn for_account(&self, account_id: Uuid) -> Vec<Notification> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.account_id == account_id)
            .cloned()
            .collect()
    }

    fn insert(&self, notification: NewNotification) -> Notification {
        let now = Utc::now();
        let created = Notification {
            id: Uuid::new_v4(),
            account_id: notification.account_id,
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            category: notification.category,
            priority: notification.priority,
            read: false,
            read_at: None,
            action_url: notification.action_url,
            action_text: notification.action_text,
            related_model: notification.related_model,
            related_id: notification.related_id,
            expires_at: notification.expires_at,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(created.clone());
        created
    }

    fn visible(&self, account_id: Uuid) -> Vec<Notification> {
        let now = Utc::now();
        let mut rows: Vec<Notification> = self
            .for_account(account_id)
            .into_iter()
            .filter(|n| !n.is_expired(now))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotifications {
    async fn create(&self, notification: NewNotification) -> AppResult<Notification> {
        Ok(self.insert(notification))
    }

    async fn create_many(&self, notifications: Vec<NewNotification>) -> AppResult<u64> {
        let count = notifications.len() as u64;
        for notification in notifications {
            self.insert(notification);
        }
        Ok(count)
    }

    async fn find_for(&self, id: Uuid, account_id: Uuid) -> AppResult<Option<Notification>> {
        Ok(self.visible(account_id).into_iter().find(|n| n.id == id))
    }

    async fn list(
        &self,
        account_id: Uuid,
        filter: NotificationFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Notification>, u64)> {
        let matching: Vec<Notification> = self
            .visible(account_id)
            .into_iter()
            .filter(|n| filter.read.map_or(true, |r| n.read == r))
            .filter(|n| filter.kind.map_or(true, |k| n.kind == k))
            .collect();
        Ok(paginate(&matching, page))
    }

    async fn unread_count(&self, account_id: Uuid) -> AppResult<u64> {
        Ok(self.visible(account_id).iter().filter(|n| !n.read).count() as u64)
    }

    async fn set_read(
        &self,
        id: Uuid,
        account_id: Uuid,
        read: bool,
    ) -> AppResult<Option<Notification>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows
            .iter_mut()
            .find(|n| n.id == id && n.account_id == account_id)
            .map(|n| {
                n.read = read;
                n.read_at = read.then(Utc::now);
                n.clone()
            }))
    }

    async fn mark_all_read(&self, account_id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut count = 0;
        for n in rows
            .iter_mut()
            .filter(|n| n.account_id == account_id && !n.read)
        {
            n.read = true;
            n.read_at = Some(Utc::now());
            count += 1;
        }
        Ok(count)
    }

    async fn delete(&self, id: Uuid, account_id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|n| !(n.id == id && n.account_id == account_id));
        Ok(rows.len() < before)
    }

    async fn clear_read(&self, account_id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|n| !(n.account_id == account_id && n.read));
        Ok((before - rows.len()) as u64)
    }

    async fn stats(&self) -> AppResult<NotificationStats> {
        let rows = self.rows.lock().unwrap();
        let read = rows.iter().filter(|n| n.read).count() as u64;
        Ok(NotificationStats {
            total: rows.len() as u64,
            read,
            unread: rows.len() as u64 - read,
            ..NotificationStats::default()
        })
    }
}

// =============================================================================
// Unit of work, files and mail
// =============================================================================

#[derive(Default)]
pub struct MemoryUow {
    pub accounts: Arc<MemoryAccounts>,
    pub expenses: Arc<MemoryExpenses>,
    pub salary_slips: Arc<MemorySalarySlips>,
    pub notifications: Arc<MemoryNotifications>,
}

impl UnitOfWork for MemoryUow {
    fn accounts(&self) -> Arc<dyn AccountRepository> {
        self.accounts.clone()
    }

    fn expenses(&self) -> Arc<dyn ExpenseRepository> {
        self.expenses.clone()
    }

    fn salary_slips(&self) -> Arc<dyn SalarySlipRepository> {
        self.salary_slips.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationRepository> {
        self.notifications.clone()
    }
}

#[derive(Default)]
pub struct MemoryFiles {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFiles {
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl FileStore for MemoryFiles {
    async fn save(&self, dir: &str, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        let path = format!("{}/{}", dir, file_name);
        self.files.lock().unwrap().insert(path.clone(), bytes);
        Ok(path)
    }

    async fn read(&self, path: &str) -> AppResult<Vec<u8>> {
        self.get(path).ok_or(AppError::NotFound("File"))
    }

    async fn remove(&self, path: &str) -> AppResult<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }
}

/// Keeps every queued email for inspection
#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<EmailJob>>,
}

#[async_trait]
impl Mailer for Outbox {
    async fn enqueue(&self, job: EmailJob) -> AppResult<()> {
        self.sent.lock().unwrap().push(job);
        Ok(())
    }
}

/// Real services over in-memory infrastructure
pub struct Harness {
    pub uow: Arc<MemoryUow>,
    pub files: Arc<MemoryFiles>,
    pub outbox: Arc<Outbox>,
    pub services: Services,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        let uow = Arc::new(MemoryUow::default());
        let files = Arc::new(MemoryFiles::default());
        let outbox = Arc::new(Outbox::default());
        let config = Config::for_tests(std::env::temp_dir().join("payroll-api-tests"));

        let services = Services::from_parts(
            uow.clone(),
            files.clone(),
            Arc::new(PdfRenderer::new()),
            outbox.clone(),
            config.clone(),
        );

        Self {
            uow,
            files,
            outbox,
            services,
            config,
        }
    }
}
