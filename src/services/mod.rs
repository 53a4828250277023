//! Application services layer - Use cases and business logic.
//!
//! Services enforce authorization for the calling [`Actor`](crate::domain::Actor),
//! orchestrate the repositories through the Unit of Work and trigger the
//! best-effort side effects (notifications, stored files, queued email).

mod account_service;
mod auth_service;
pub mod container;
mod expense_service;
mod notification_service;
mod salary_service;

#[cfg(test)]
pub(crate) mod test_support;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use account_service::{AccountDraft, AccountManager, AccountService};
pub use auth_service::{
    AuthService, AuthSession, Authenticator, Claims, Registration, TokenResponse,
};
pub use expense_service::{
    ExpenseDesk, ExpenseService, ExpenseSubmission, ReceiptFile, ReceiptUpload,
};
pub use notification_service::{
    BroadcastReceipt, NotificationCenter, NotificationPage, NotificationService,
};
pub use salary_service::{EmployeeSlips, SalaryOffice, SalaryService, SlipDocument};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
