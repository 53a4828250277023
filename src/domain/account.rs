//! Account domain entity and related types.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::access::{Actor, Role};
use super::money::ensure_cents;
use crate::config::{
    EMPLOYEE_CODE_PREFIX, EMPLOYEE_CODE_WIDTH, MAX_DEPARTMENT_LENGTH, MAX_NAME_LENGTH,
    MAX_POSITION_LENGTH, MIN_NAME_LENGTH,
};
use crate::errors::{AppError, AppResult};

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("name pattern is valid"));

/// Base compensation figures kept on the account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BaseSalary {
    #[schema(value_type = f64, example = 40000.0)]
    pub basic: Decimal,
    #[schema(value_type = f64, example = 5000.0)]
    pub allowances: Decimal,
}

impl BaseSalary {
    /// Monthly total before deductions.
    pub fn total(&self) -> Decimal {
        self.basic + self.allowances
    }

    pub fn validate(&self) -> AppResult<()> {
        ensure_cents("Basic salary", self.basic)?;
        ensure_cents("Allowances", self.allowances)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub ifsc_code: Option<String>,
}

impl BankDetails {
    /// Trimmed, empty values dropped, IFSC upper-cased.
    pub fn normalized(self) -> Self {
        Self {
            account_number: clean(self.account_number),
            bank_name: clean(self.bank_name),
            ifsc_code: clean(self.ifsc_code).map(|code| code.to_uppercase()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.account_number.is_none() && self.bank_name.is_none() && self.ifsc_code.is_none()
    }
}

/// Account domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub employee_code: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub joining_date: NaiveDate,
    pub salary: BaseSalary,
    pub bank_details: BankDetails,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// Employee code, or an empty marker for accounts that never had one.
    pub fn code_or_placeholder(&self) -> &str {
        self.employee_code.as_deref().unwrap_or("N/A")
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Insert payload handed to the account store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub salary: BaseSalary,
    pub bank_details: BankDetails,
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub salary: Option<BaseSalary>,
    pub bank_details: Option<BankDetails>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.department.is_none()
            && self.position.is_none()
            && self.salary.is_none()
            && self.bank_details.is_none()
    }
}

/// Listing filters for the admin account directory.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub role: Option<Role>,
    pub department: Option<String>,
    pub is_active: Option<bool>,
    /// Case-insensitive match on name, email or employee code
    pub search: Option<String>,
}

/// Per-department head count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCount {
    pub department: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    pub total_users: u64,
    pub active_users: u64,
    pub inactive_users: u64,
    pub total_employees: u64,
    pub total_admins: u64,
    /// Accounts that joined in the last 30 days
    pub recent_joinings: u64,
    pub departments: Vec<DepartmentCount>,
}

/// Account response (safe to return to client)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "Asha Verma")]
    pub name: String,
    #[schema(example = "asha@example.com")]
    pub email: String,
    pub role: Role,
    #[schema(example = "EMP0001")]
    pub employee_code: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub joining_date: NaiveDate,
    pub salary: BaseSalary,
    pub bank_details: BankDetails,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
            employee_code: account.employee_code,
            department: account.department,
            position: account.position,
            joining_date: account.joining_date,
            salary: account.salary,
            bank_details: account.bank_details,
            is_active: account.is_active,
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

/// Compact view used by the employee picker.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub employee_code: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub salary: BaseSalary,
}

impl From<Account> for EmployeeSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            employee_code: account.employee_code,
            department: account.department,
            position: account.position,
            salary: account.salary,
        }
    }
}

/// `EMP0042` for the 42nd code issued.
pub fn employee_code(sequence: u64) -> String {
    format!(
        "{}{:0width$}",
        EMPLOYEE_CODE_PREFIX,
        sequence,
        width = EMPLOYEE_CODE_WIDTH
    )
}

/// Trimmed name of 2-50 letters and spaces.
pub fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    let len = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
        return Err(AppError::validation(format!(
            "Name must be between {} and {} characters",
            MIN_NAME_LENGTH, MAX_NAME_LENGTH
        )));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(AppError::validation(
            "Name can only contain letters and spaces",
        ));
    }
    Ok(name.to_string())
}

/// Emails are stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_department(department: Option<String>) -> AppResult<Option<String>> {
    bounded("Department", department, MAX_DEPARTMENT_LENGTH)
}

pub fn validate_position(position: Option<String>) -> AppResult<Option<String>> {
    bounded("Position", position, MAX_POSITION_LENGTH)
}

fn bounded(field: &str, value: Option<String>, max: usize) -> AppResult<Option<String>> {
    match clean(value) {
        Some(v) if v.chars().count() > max => Err(AppError::validation(format!(
            "{} cannot exceed {} characters",
            field, max
        ))),
        other => Ok(other),
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_employee_code_is_zero_padded() {
        assert_eq!(employee_code(1), "EMP0001");
        assert_eq!(employee_code(42), "EMP0042");
        assert_eq!(employee_code(12345), "EMP12345");
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Asha Verma ").unwrap(), "Asha Verma");
        assert!(validate_name("A").is_err());
        assert!(validate_name("R2D2").is_err());
        assert!(validate_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
    }

    #[test]
    fn test_department_and_position_bounds() {
        assert_eq!(validate_department(Some("  ".to_string())).unwrap(), None);
        assert_eq!(
            validate_department(Some(" Finance ".to_string())).unwrap(),
            Some("Finance".to_string())
        );
        assert!(validate_department(Some("x".repeat(31))).is_err());
        assert!(validate_position(Some("x".repeat(51))).is_err());
    }

    #[test]
    fn test_base_salary() {
        let salary = BaseSalary {
            basic: dec!(40000),
            allowances: dec!(2500.50),
        };
        assert_eq!(salary.total(), dec!(42500.50));
        assert!(salary.validate().is_ok());

        let negative = BaseSalary {
            basic: dec!(-1),
            allowances: dec!(0),
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_bank_details_normalized() {
        let details = BankDetails {
            account_number: Some(" 001122 ".to_string()),
            bank_name: Some("".to_string()),
            ifsc_code: Some("sbin0001".to_string()),
        }
        .normalized();

        assert_eq!(details.account_number.as_deref(), Some("001122"));
        assert_eq!(details.bank_name, None);
        assert_eq!(details.ifsc_code.as_deref(), Some("SBIN0001"));
    }
}
