//! Expense claims and their approval lifecycle.
//!
//! A claim starts `pending` and moves exactly once to `approved` or
//! `rejected`. Content edits and deletion are only possible while pending;
//! comments can be appended in any state.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::ensure_cents;
use crate::config::{
    MAX_COMMENT_LENGTH, MAX_EXPENSE_DESCRIPTION_LENGTH, MAX_EXPENSE_TITLE_LENGTH,
    MAX_REJECTION_REASON_LENGTH, MIN_EXPENSE_DESCRIPTION_LENGTH, MIN_EXPENSE_TITLE_LENGTH,
    MIN_REJECTION_REASON_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Largest single claim accepted.
pub fn max_expense_amount() -> Decimal {
    Decimal::new(1_000_000, 0)
}

/// Smallest single claim accepted (one paisa).
pub fn min_expense_amount() -> Decimal {
    Decimal::new(1, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Travel,
    Food,
    Accommodation,
    Transport,
    OfficeSupplies,
    Training,
    Medical,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 8] = [
        ExpenseCategory::Travel,
        ExpenseCategory::Food,
        ExpenseCategory::Accommodation,
        ExpenseCategory::Transport,
        ExpenseCategory::OfficeSupplies,
        ExpenseCategory::Training,
        ExpenseCategory::Medical,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Travel => "travel",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Accommodation => "accommodation",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::OfficeSupplies => "office_supplies",
            ExpenseCategory::Training => "training",
            ExpenseCategory::Medical => "medical",
            ExpenseCategory::Other => "other",
        }
    }
}

impl FromStr for ExpenseCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::validation("Invalid category"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExpenseStatus::Pending)
    }
}

impl FromStr for ExpenseStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExpenseStatus::Pending),
            "approved" => Ok(ExpenseStatus::Approved),
            "rejected" => Ok(ExpenseStatus::Rejected),
            other => Err(AppError::validation(format!(
                "Invalid expense status '{}'",
                other
            ))),
        }
    }
}

/// Stored receipt file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub filename: String,
    pub original_name: String,
    /// Path relative to the upload root
    pub path: String,
    pub size: i64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseComment {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub author_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Expense claim domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub title: String,
    pub description: String,
    #[schema(value_type = f64, example = 1200.0)]
    pub amount: Decimal,
    pub category: ExpenseCategory,
    pub expense_date: NaiveDate,
    pub status: ExpenseStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub receipt: Option<Receipt>,
    /// Oldest first
    pub comments: Vec<ExpenseComment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn is_pending(&self) -> bool {
        self.status == ExpenseStatus::Pending
    }

    /// Conflict unless the claim is still pending.
    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(not_pending())
        }
    }
}

pub(crate) fn not_pending() -> AppError {
    AppError::conflict("Expense is no longer pending")
}

/// Validated content of a new claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub title: String,
    pub description: String,
    pub amount: Decimal,
    pub category: ExpenseCategory,
    pub expense_date: NaiveDate,
}

impl ExpenseDraft {
    pub fn new(
        title: &str,
        description: &str,
        amount: Decimal,
        category: ExpenseCategory,
        expense_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<Self> {
        Ok(Self {
            title: validate_title(title)?,
            description: validate_description(description)?,
            amount: validate_amount(amount)?,
            category,
            expense_date: validate_expense_date(expense_date, today)?,
        })
    }
}

/// Insert payload handed to the expense store.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub employee_id: Uuid,
    pub draft: ExpenseDraft,
    pub receipt: Option<Receipt>,
}

/// Partial content update of a pending claim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
    pub expense_date: Option<NaiveDate>,
}

impl ExpenseChanges {
    /// Validate and normalise every provided field.
    pub fn validated(self, today: NaiveDate) -> AppResult<Self> {
        Ok(Self {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?,
            amount: self.amount.map(validate_amount).transpose()?,
            category: self.category,
            expense_date: self
                .expense_date
                .map(|d| validate_expense_date(d, today))
                .transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.expense_date.is_none()
    }
}

/// An admin's decision on a pending claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseDecision {
    Approve,
    Reject { reason: String },
}

impl ExpenseDecision {
    /// Build from the requested target status; a rejection needs a 5-200 character reason.
    pub fn from_request(status: ExpenseStatus, reason: Option<&str>) -> AppResult<Self> {
        match status {
            ExpenseStatus::Approved => Ok(ExpenseDecision::Approve),
            ExpenseStatus::Rejected => {
                let reason = reason.map(str::trim).unwrap_or_default();
                let len = reason.chars().count();
                if !(MIN_REJECTION_REASON_LENGTH..=MAX_REJECTION_REASON_LENGTH).contains(&len) {
                    return Err(AppError::validation(format!(
                        "Rejection reason is required and must be between {} and {} characters",
                        MIN_REJECTION_REASON_LENGTH, MAX_REJECTION_REASON_LENGTH
                    )));
                }
                Ok(ExpenseDecision::Reject {
                    reason: reason.to_string(),
                })
            }
            ExpenseStatus::Pending => Err(AppError::validation(
                "Status must be either approved or rejected",
            )),
        }
    }

    pub fn status(&self) -> ExpenseStatus {
        match self {
            ExpenseDecision::Approve => ExpenseStatus::Approved,
            ExpenseDecision::Reject { .. } => ExpenseStatus::Rejected,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ExpenseDecision::Approve => None,
            ExpenseDecision::Reject { reason } => Some(reason),
        }
    }
}

/// Listing filters for expense claims.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<ExpenseStatus>,
    pub category: Option<ExpenseCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive match on title or description
    pub search: Option<String>,
}

impl ExpenseFilter {
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(AppError::validation("End date cannot be before start date"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseOverview {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    #[schema(value_type = f64)]
    pub approved_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyExpenseTotal {
    /// 1 = January
    pub month: u32,
    pub count: u64,
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub count: u64,
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseStats {
    pub overview: ExpenseOverview,
    /// Expense-date months of the requested year
    pub monthly: Vec<MonthlyExpenseTotal>,
    pub categories: Vec<CategoryTotal>,
}

fn validate_title(title: &str) -> AppResult<String> {
    text_between(
        "Title",
        title,
        MIN_EXPENSE_TITLE_LENGTH,
        MAX_EXPENSE_TITLE_LENGTH,
    )
}

fn validate_description(description: &str) -> AppResult<String> {
    text_between(
        "Description",
        description,
        MIN_EXPENSE_DESCRIPTION_LENGTH,
        MAX_EXPENSE_DESCRIPTION_LENGTH,
    )
}

/// Comment text of 1-300 characters after trimming.
pub fn validate_comment(message: &str) -> AppResult<String> {
    text_between("Comment", message, 1, MAX_COMMENT_LENGTH)
}

fn validate_amount(amount: Decimal) -> AppResult<Decimal> {
    ensure_cents("Amount", amount)?;
    if amount < min_expense_amount() || amount > max_expense_amount() {
        return Err(AppError::validation(
            "Amount must be between 0.01 and 1,000,000",
        ));
    }
    Ok(amount)
}

fn validate_expense_date(date: NaiveDate, today: NaiveDate) -> AppResult<NaiveDate> {
    if date > today {
        return Err(AppError::validation("Expense date cannot be in the future"));
    }
    Ok(date)
}

fn text_between(field: &str, value: &str, min: usize, max: usize) -> AppResult<String> {
    let value = value.trim();
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::validation(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn draft(amount: Decimal, date: NaiveDate) -> AppResult<ExpenseDraft> {
        ExpenseDraft::new(
            "Printer toner",
            "Toner cartridges for the office printer",
            amount,
            ExpenseCategory::OfficeSupplies,
            date,
            today(),
        )
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(
            "office_supplies".parse::<ExpenseCategory>().unwrap(),
            ExpenseCategory::OfficeSupplies
        );
        assert!("gadgets".parse::<ExpenseCategory>().is_err());
    }

    #[test]
    fn test_amount_bounds() {
        assert!(draft(dec!(0.01), today()).is_ok());
        assert!(draft(dec!(1000000), today()).is_ok());
        assert!(draft(dec!(0), today()).is_err());
        assert!(draft(dec!(1000000.01), today()).is_err());
        assert!(draft(dec!(10.001), today()).is_err());
    }

    #[test]
    fn test_expense_date_not_in_future() {
        assert!(draft(dec!(100), today()).is_ok());
        let tomorrow = today().succ_opt().unwrap();
        assert!(draft(dec!(100), tomorrow).is_err());
    }

    #[test]
    fn test_title_and_description_are_trimmed_and_bounded() {
        let draft = ExpenseDraft::new(
            "  Taxi  ",
            "  Airport drop for client visit  ",
            dec!(450),
            ExpenseCategory::Transport,
            today(),
            today(),
        )
        .unwrap();
        assert_eq!(draft.title, "Taxi");
        assert_eq!(draft.description, "Airport drop for client visit");

        assert!(ExpenseDraft::new(
            "ab",
            "Long enough description",
            dec!(1),
            ExpenseCategory::Other,
            today(),
            today()
        )
        .is_err());
        assert!(ExpenseDraft::new(
            "Taxi",
            "too short",
            dec!(1),
            ExpenseCategory::Other,
            today(),
            today()
        )
        .is_err());
    }

    #[test]
    fn test_rejection_requires_reason_in_bounds() {
        assert!(ExpenseDecision::from_request(ExpenseStatus::Rejected, None).is_err());
        assert!(ExpenseDecision::from_request(ExpenseStatus::Rejected, Some("nope")).is_err());
        assert!(
            ExpenseDecision::from_request(ExpenseStatus::Rejected, Some(&"x".repeat(201)))
                .is_err()
        );

        let decision =
            ExpenseDecision::from_request(ExpenseStatus::Rejected, Some("  Missing receipt "))
                .unwrap();
        assert_eq!(decision.status(), ExpenseStatus::Rejected);
        assert_eq!(decision.reason(), Some("Missing receipt"));
    }

    #[test]
    fn test_approval_ignores_reason() {
        let decision =
            ExpenseDecision::from_request(ExpenseStatus::Approved, Some("whatever")).unwrap();
        assert_eq!(decision, ExpenseDecision::Approve);
        assert_eq!(decision.reason(), None);
    }

    #[test]
    fn test_pending_is_not_a_decision() {
        assert!(ExpenseDecision::from_request(ExpenseStatus::Pending, None).is_err());
    }

    #[test]
    fn test_changes_validated() {
        let changes = ExpenseChanges {
            amount: Some(dec!(-5)),
            ..Default::default()
        };
        assert!(changes.validated(today()).is_err());

        let changes = ExpenseChanges {
            title: Some(" Hotel ".to_string()),
            ..Default::default()
        }
        .validated(today())
        .unwrap();
        assert_eq!(changes.title.as_deref(), Some("Hotel"));
    }

    #[test]
    fn test_filter_date_range() {
        let filter = ExpenseFilter {
            start_date: Some(today()),
            end_date: today().pred_opt(),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn test_comment_bounds() {
        assert!(validate_comment("   ").is_err());
        assert!(validate_comment(&"x".repeat(301)).is_err());
        assert_eq!(validate_comment(" ok ").unwrap(), "ok");
    }
}
