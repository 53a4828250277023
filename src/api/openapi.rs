//! OpenAPI documentation served by Swagger UI at `/swagger-ui`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    account_handler, auth_handler, expense_handler, notification_handler, salary_handler,
};
use crate::domain::{
    expense::{CategoryTotal, ExpenseOverview, MonthlyExpenseTotal},
    notification::LabelCount,
    salary::{MonthlyPayout, SalaryOverview, YearlyPayout},
    AccountResponse, AccountStats, Allowances, AllowancesPatch, BankDetails, BaseSalary,
    Deductions, DeductionsPatch, DepartmentCount, EmployeeSummary, Expense, ExpenseCategory,
    ExpenseComment, ExpenseStats, ExpenseStatus, Notification, NotificationCategory,
    NotificationStats, NotificationType, Priority, Receipt, RelatedModel, Role, SalarySlip,
    SalaryStats, SlipStatus, WorkingDays,
};
use crate::services::{AuthSession, BroadcastReceipt, EmployeeSlips, TokenResponse};
use crate::types::PaginationMeta;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payroll API",
        version = "0.1.0",
        description = "Employee accounts, expense claims, salary slips and notifications"
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        auth_handler::register,
        auth_handler::login,
        auth_handler::logout,
        auth_handler::me,
        auth_handler::change_password,
        auth_handler::refresh_token,
        account_handler::list_accounts,
        account_handler::create_account,
        account_handler::list_employees,
        account_handler::account_stats,
        account_handler::get_account,
        account_handler::update_account,
        account_handler::deactivate_account,
        account_handler::activate_account,
        account_handler::change_role,
        expense_handler::create_expense,
        expense_handler::list_expenses,
        expense_handler::expense_stats,
        expense_handler::get_expense,
        expense_handler::update_expense,
        expense_handler::decide_expense,
        expense_handler::add_comment,
        expense_handler::delete_expense,
        expense_handler::download_receipt,
        salary_handler::create_slip,
        salary_handler::list_slips,
        salary_handler::slip_stats,
        salary_handler::employee_slips,
        salary_handler::get_slip,
        salary_handler::update_slip,
        salary_handler::finalize_slip,
        salary_handler::generate_pdf,
        salary_handler::send_slip,
        salary_handler::download_slip,
        salary_handler::delete_slip,
        notification_handler::list_notifications,
        notification_handler::unread_count,
        notification_handler::get_notification,
        notification_handler::mark_read,
        notification_handler::mark_unread,
        notification_handler::mark_all_read,
        notification_handler::delete_notification,
        notification_handler::clear_read,
        notification_handler::create_notification,
        notification_handler::broadcast,
        notification_handler::notification_stats,
    ),
    components(
        schemas(
            Role,
            AccountResponse,
            AccountStats,
            DepartmentCount,
            BankDetails,
            BaseSalary,
            EmployeeSummary,
            Expense,
            ExpenseCategory,
            ExpenseStatus,
            ExpenseComment,
            Receipt,
            ExpenseStats,
            ExpenseOverview,
            MonthlyExpenseTotal,
            CategoryTotal,
            SalarySlip,
            SlipStatus,
            Allowances,
            AllowancesPatch,
            Deductions,
            DeductionsPatch,
            WorkingDays,
            SalaryStats,
            SalaryOverview,
            MonthlyPayout,
            YearlyPayout,
            EmployeeSlips,
            Notification,
            NotificationType,
            NotificationCategory,
            Priority,
            RelatedModel,
            NotificationStats,
            LabelCount,
            PaginationMeta,
            TokenResponse,
            AuthSession,
            BroadcastReceipt,
            auth_handler::RegisterRequest,
            auth_handler::LoginRequest,
            auth_handler::ChangePasswordRequest,
            account_handler::CreateAccountRequest,
            account_handler::UpdateAccountRequest,
            account_handler::ChangeRoleRequest,
            expense_handler::ExpenseForm,
            expense_handler::UpdateExpenseRequest,
            expense_handler::ExpenseStatusRequest,
            expense_handler::CommentRequest,
            salary_handler::CreateSlipRequest,
            salary_handler::UpdateSlipRequest,
            notification_handler::NotificationFeed,
            notification_handler::UnreadCount,
            notification_handler::AffectedCount,
            notification_handler::NotificationContent,
            notification_handler::CreateNotificationRequest,
            notification_handler::BroadcastRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and tokens"),
        (name = "Users", description = "Account directory"),
        (name = "Expenses", description = "Expense claims and approvals"),
        (name = "Salary slips", description = "Monthly salary slips, PDFs and delivery"),
        (name = "Notifications", description = "Per-account notification feed")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}
