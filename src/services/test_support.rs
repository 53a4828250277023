//! Mock-backed unit of work and fixtures for service unit tests.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    Account, Actor, Allowances, BankDetails, BaseSalary, Deductions, Expense, ExpenseCategory,
    ExpenseStatus, Role, SalarySlip, SlipStatus, WorkingDays,
};
use crate::infra::{
    AccountRepository, ExpenseRepository, MockAccountRepository, MockExpenseRepository,
    MockNotificationRepository, MockSalarySlipRepository, NotificationRepository,
    SalarySlipRepository, UnitOfWork,
};

/// Unit of work whose repositories are mockall mocks. Repositories left at
/// their default panic on any call.
pub struct TestUow {
    pub accounts: Arc<dyn AccountRepository>,
    pub expenses: Arc<dyn ExpenseRepository>,
    pub salary_slips: Arc<dyn SalarySlipRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Default for TestUow {
    fn default() -> Self {
        Self {
            accounts: Arc::new(MockAccountRepository::new()),
            expenses: Arc::new(MockExpenseRepository::new()),
            salary_slips: Arc::new(MockSalarySlipRepository::new()),
            notifications: Arc::new(MockNotificationRepository::new()),
        }
    }
}

impl TestUow {
    pub fn with_accounts(accounts: MockAccountRepository) -> Self {
        Self {
            accounts: Arc::new(accounts),
            ..Self::default()
        }
    }
}

impl UnitOfWork for TestUow {
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

pub fn account(role: Role) -> Account {
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
    Account {
        id: Uuid::new_v4(),
        name: "Asha Verma".to_string(),
        email: "asha@example.com".to_string(),
        password_hash: String::new(),
        role,
        employee_code: (role == Role::Employee).then(|| "EMP0001".to_string()),
        department: Some("Engineering".to_string()),
        position: Some("Developer".to_string()),
        joining_date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
        salary: BaseSalary {
            basic: dec!(40000),
            allowances: dec!(0),
        },
        bank_details: BankDetails::default(),
        is_active: true,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn actor(role: Role) -> Actor {
    account(role).actor()
}

pub fn expense(employee_id: Uuid, status: ExpenseStatus) -> Expense {
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
    Expense {
        id: Uuid::new_v4(),
        employee_id,
        title: "Printer paper".to_string(),
        description: "Two boxes of A4 paper".to_string(),
        amount: dec!(1200),
        category: ExpenseCategory::OfficeSupplies,
        expense_date: NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        status,
        approved_by: None,
        approved_at: None,
        rejection_reason: None,
        receipt: None,
        comments: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn slip(employee_id: Uuid, status: SlipStatus) -> SalarySlip {
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
    SalarySlip {
        id: Uuid::new_v4(),
        employee_id,
        month: 6,
        year: 2024,
        basic_salary: dec!(50000),
        allowances: Allowances {
            hra: dec!(20000),
            ..Allowances::default()
        },
        deductions: Deductions {
            tax: dec!(5000),
            ..Deductions::default()
        },
        working_days: WorkingDays {
            total: 22,
            worked: 22,
        },
        status,
        generated_by: Uuid::new_v4(),
        gross_salary: dec!(70000),
        net_salary: dec!(65000),
        document_path: None,
        notes: None,
        finalized_at: None,
        sent_at: None,
        created_at: now,
        updated_at: now,
    }
}
