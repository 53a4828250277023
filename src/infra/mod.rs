//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections and repositories
//! - Redis for rate limiting
//! - Local file storage for receipts and salary slip documents
//! - The email job queue
//! - Unit of Work for repository access

pub mod cache;
pub mod db;
pub mod mail_queue;
pub mod repositories;
pub mod storage;
pub mod unit_of_work;

pub use cache::{Cache, RateLimitStatus};
pub use db::{Database, Migrator};
pub use mail_queue::{EmailQueue, LogMailer, Mailer};
pub use repositories::{
    AccountRepository, AccountStore, ExpenseRepository, ExpenseStore, NotificationRepository,
    NotificationStore, SalarySlipRepository, SalarySlipStore,
};
pub use storage::{FileStore, LocalFileStore};
pub use unit_of_work::{Persistence, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use mail_queue::MockMailer;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{
    MockAccountRepository, MockExpenseRepository, MockNotificationRepository,
    MockSalarySlipRepository,
};
#[cfg(any(test, feature = "test-utils"))]
pub use storage::MockFileStore;
