//! Unit of Work pattern implementation.
//!
//! Centralizes access to every repository so services depend on a single
//! handle. Multi-row invariants (employee code issuance, status transitions)
//! are enforced inside the repositories with transactions or conditional
//! updates, so the unit of work itself stays a plain registry.

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use super::repositories::{
    AccountRepository, AccountStore, ExpenseRepository, ExpenseStore, NotificationRepository,
    NotificationStore, SalarySlipRepository, SalarySlipStore,
};

/// Unit of Work trait for dependency injection.
///
/// Services are generic over this trait; tests provide in-memory or mocked
/// repositories through it.
pub trait UnitOfWork: Send + Sync {
    fn accounts(&self) -> Arc<dyn AccountRepository>;

    fn expenses(&self) -> Arc<dyn ExpenseRepository>;

    fn salary_slips(&self) -> Arc<dyn SalarySlipRepository>;

    fn notifications(&self) -> Arc<dyn NotificationRepository>;
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    accounts: Arc<AccountStore>,
    expenses: Arc<ExpenseStore>,
    salary_slips: Arc<SalarySlipStore>,
    notifications: Arc<NotificationStore>,
}

impl Persistence {
    /// Create new UnitOfWork instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            accounts: Arc::new(AccountStore::new(db.clone())),
            expenses: Arc::new(ExpenseStore::new(db.clone())),
            salary_slips: Arc::new(SalarySlipStore::new(db.clone())),
            notifications: Arc::new(NotificationStore::new(db)),
        }
    }
}

impl UnitOfWork for Persistence {
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
