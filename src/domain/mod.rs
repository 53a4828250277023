//! Domain layer - Core business entities and logic
//!
//! This module contains the payroll domain models (accounts, expense claims,
//! salary slips, notifications) and the rules that govern them, independent
//! of persistence and transport.
//!
//! DDD: Domain layer has NO external dependencies (except error types).
//! Contains: Entities, Value Objects, Domain Services.

pub mod access;
pub mod account;
pub mod expense;
pub mod money;
pub mod notification;
pub mod password;
pub mod salary;
pub mod words;

pub use access::{Actor, Role};
pub use account::{
    Account, AccountChanges, AccountFilter, AccountResponse, AccountStats, BankDetails,
    BaseSalary, DepartmentCount, EmployeeSummary, NewAccount,
};
pub use expense::{
    Expense, ExpenseCategory, ExpenseChanges, ExpenseComment, ExpenseDecision, ExpenseDraft,
    ExpenseFilter, ExpenseStats, ExpenseStatus, NewExpense, Receipt,
};
pub use money::{format_amount, format_inr, round_money};
pub use notification::{
    NewNotification, Notification, NotificationCategory, NotificationFilter, NotificationStats,
    NotificationType, Priority, RelatedModel,
};
pub use password::Password;
pub use salary::{
    month_name, Allowances, AllowancesPatch, Deductions, DeductionsPatch, NewSalarySlip,
    PayPeriod, SalaryBreakdown, SalarySlip, SalaryStats, SlipChanges, SlipFilter, SlipInput,
    SlipRevision, SlipStatus, WorkingDays,
};
pub use words::amount_in_words;
