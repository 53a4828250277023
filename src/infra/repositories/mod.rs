//! Repository layer - Data access abstraction
//!
//! One trait per aggregate, each backed by a SeaORM store. Services only ever
//! see the traits.

mod account_repository;
pub(crate) mod entities;
mod expense_repository;
mod notification_repository;
mod salary_slip_repository;

pub use account_repository::{AccountRepository, AccountStore};
pub use expense_repository::{ExpenseRepository, ExpenseStore};
pub use notification_repository::{NotificationRepository, NotificationStore};
pub use salary_slip_repository::{SalarySlipRepository, SalarySlipStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use account_repository::MockAccountRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use expense_repository::MockExpenseRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use notification_repository::MockNotificationRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use salary_slip_repository::MockSalarySlipRepository;
