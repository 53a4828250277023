//! Service Container - Centralized service access.
//!
//! Handlers reach every use case through [`ServiceContainer`]; the concrete
//! [`Services`] wires the SeaORM unit of work, file store, renderer and mail
//! queue into each service.

use std::sync::Arc;

use super::{
    AccountManager, AccountService, AuthService, Authenticator, ExpenseDesk, ExpenseService,
    NotificationCenter, NotificationService, SalaryOffice, SalaryService,
};
use crate::config::Config;
use crate::infra::{FileStore, LocalFileStore, Mailer, Persistence};
use crate::render::{DocumentRenderer, PdfRenderer};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn accounts(&self) -> Arc<dyn AccountService>;

    fn expenses(&self) -> Arc<dyn ExpenseService>;

    fn salary_slips(&self) -> Arc<dyn SalaryService>;

    fn notifications(&self) -> Arc<dyn NotificationService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth: Arc<dyn AuthService>,
    accounts: Arc<dyn AccountService>,
    expenses: Arc<dyn ExpenseService>,
    salary_slips: Arc<dyn SalaryService>,
    notifications: Arc<dyn NotificationService>,
}

impl Services {
    /// Assemble from already-built services
    pub fn new(
        auth: Arc<dyn AuthService>,
        accounts: Arc<dyn AccountService>,
        expenses: Arc<dyn ExpenseService>,
        salary_slips: Arc<dyn SalaryService>,
        notifications: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            auth,
            accounts,
            expenses,
            salary_slips,
            notifications,
        }
    }

    /// Wire every service over one unit of work
    pub fn from_parts<U: crate::infra::UnitOfWork + 'static>(
        uow: Arc<U>,
        files: Arc<dyn FileStore>,
        renderer: Arc<dyn DocumentRenderer>,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        let expenses = ExpenseDesk::new(uow.clone(), files.clone(), config.max_file_size);
        let salary_slips = SalaryOffice::new(
            uow.clone(),
            files,
            renderer,
            mailer,
            config.company_name.clone(),
        );

        Self {
            accounts: Arc::new(AccountManager::new(uow.clone())),
            expenses: Arc::new(expenses),
            salary_slips: Arc::new(salary_slips),
            notifications: Arc::new(NotificationCenter::new(uow.clone())),
            auth: Arc::new(Authenticator::new(uow, config)),
        }
    }

    /// Production wiring: SeaORM persistence, files under `UPLOAD_DIR`, PDF rendering
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        Self::from_parts(
            Arc::new(Persistence::new(db)),
            Arc::new(LocalFileStore::new(config.upload_dir.clone())),
            Arc::new(PdfRenderer::new()),
            mailer,
            config,
        )
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    fn accounts(&self) -> Arc<dyn AccountService> {
        self.accounts.clone()
    }

    fn expenses(&self) -> Arc<dyn ExpenseService> {
        self.expenses.clone()
    }

    fn salary_slips(&self) -> Arc<dyn SalaryService> {
        self.salary_slips.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationService> {
        self.notifications.clone()
    }
}
