//! Per-account notification feed entries and the event templates that produce them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::expense::Expense;
use super::salary::SalarySlip;
use crate::config::{
    MAX_NOTIFICATION_ACTION_TEXT_LENGTH, MAX_NOTIFICATION_MESSAGE_LENGTH,
    MAX_NOTIFICATION_TITLE_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Declares a closed string enum with `as_str`, `FromStr` and an `ALL` list.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        AppError::validation(format!(
                            "Invalid {} '{}'",
                            stringify!($name),
                            s
                        ))
                    })
            }
        }
    };
}

string_enum!(
    /// Visual kind of a notification.
    NotificationType {
        Info => "info",
        Success => "success",
        Warning => "warning",
        Error => "error",
        Expense => "expense",
        Salary => "salary",
        System => "system",
    }
);

string_enum!(
    /// Event that produced a notification.
    NotificationCategory {
        ExpenseSubmitted => "expense_submitted",
        ExpenseApproved => "expense_approved",
        ExpenseRejected => "expense_rejected",
        SalaryGenerated => "salary_generated",
        SalarySent => "salary_sent",
        SystemUpdate => "system_update",
        Reminder => "reminder",
        Other => "other",
    }
);

string_enum!(
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
);

/// Kind of entity a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RelatedModel {
    Expense,
    SalarySlip,
    User,
}

impl RelatedModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedModel::Expense => "Expense",
            RelatedModel::SalarySlip => "SalarySlip",
            RelatedModel::User => "User",
        }
    }
}

impl FromStr for RelatedModel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Expense" => Ok(RelatedModel::Expense),
            "SalarySlip" => Ok(RelatedModel::SalarySlip),
            "User" => Ok(RelatedModel::User),
            other => Err(AppError::validation(format!(
                "Invalid related model '{}'",
                other
            ))),
        }
    }
}

/// Notification domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub account_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub category: NotificationCategory,
    pub priority: Priority,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub action_url: Option<String>,
    pub action_text: Option<String>,
    pub related_model: Option<RelatedModel>,
    pub related_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Insert payload for the notification store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub account_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub category: NotificationCategory,
    pub priority: Priority,
    pub action_url: Option<String>,
    pub action_text: Option<String>,
    pub related_model: Option<RelatedModel>,
    pub related_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewNotification {
    /// Plain notification with medium priority and no related entity.
    pub fn new(
        account_id: Uuid,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        category: NotificationCategory,
    ) -> Self {
        Self {
            account_id,
            title: title.into(),
            message: message.into(),
            kind,
            category,
            priority: Priority::Medium,
            action_url: None,
            action_text: None,
            related_model: None,
            related_id: None,
            expires_at: None,
        }
    }

    /// Same content addressed to another account.
    pub fn for_account(&self, account_id: Uuid) -> Self {
        Self {
            account_id,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        check_len("Title", &self.title, 1, MAX_NOTIFICATION_TITLE_LENGTH)?;
        check_len("Message", &self.message, 1, MAX_NOTIFICATION_MESSAGE_LENGTH)?;
        if let Some(text) = &self.action_text {
            check_len("Action text", text, 0, MAX_NOTIFICATION_ACTION_TEXT_LENGTH)?;
        }
        Ok(())
    }

    fn about_expense(mut self, expense: &Expense) -> Self {
        self.related_model = Some(RelatedModel::Expense);
        self.related_id = Some(expense.id);
        self.action_url = Some(format!("/expenses/{}", expense.id));
        self.action_text = Some("View Expense".to_string());
        self
    }

    fn about_slip(mut self, slip: &SalarySlip) -> Self {
        self.related_model = Some(RelatedModel::SalarySlip);
        self.related_id = Some(slip.id);
        self.action_url = Some(format!("/salary-slips/{}", slip.id));
        self.action_text = Some("View Salary Slip".to_string());
        self
    }

    /// Sent to each active admin when an employee submits a claim.
    pub fn expense_submitted(admin_id: Uuid, expense: &Expense, submitter: &str) -> Self {
        Self::new(
            admin_id,
            "Expense Submitted",
            format!(
                "{} submitted expense \"{}\" for approval.",
                submitter, expense.title
            ),
            NotificationType::Info,
            NotificationCategory::ExpenseSubmitted,
        )
        .about_expense(expense)
    }

    pub fn expense_approved(expense: &Expense, approver: &str) -> Self {
        Self::new(
            expense.employee_id,
            "Expense Approved",
            format!(
                "Your expense \"{}\" has been approved by {}.",
                expense.title, approver
            ),
            NotificationType::Success,
            NotificationCategory::ExpenseApproved,
        )
        .about_expense(expense)
    }

    pub fn expense_rejected(expense: &Expense) -> Self {
        Self::new(
            expense.employee_id,
            "Expense Rejected",
            format!(
                "Your expense \"{}\" has been rejected. Reason: {}",
                expense.title,
                expense.rejection_reason.as_deref().unwrap_or("Not specified")
            ),
            NotificationType::Error,
            NotificationCategory::ExpenseRejected,
        )
        .about_expense(expense)
    }

    pub fn salary_generated(slip: &SalarySlip) -> Self {
        Self::new(
            slip.employee_id,
            "Salary Slip Generated",
            format!(
                "Your salary slip for {} has been generated.",
                slip.period()
            ),
            NotificationType::Success,
            NotificationCategory::SalaryGenerated,
        )
        .about_slip(slip)
    }

    pub fn salary_sent(slip: &SalarySlip) -> Self {
        Self::new(
            slip.employee_id,
            "Salary Slip Sent",
            format!(
                "Your salary slip for {} has been sent to your email.",
                slip.period()
            ),
            NotificationType::Info,
            NotificationCategory::SalarySent,
        )
        .about_slip(slip)
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    if len > max {
        return Err(AppError::validation(format!(
            "{} cannot exceed {} characters",
            field, max
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub read: Option<bool>,
    pub kind: Option<NotificationType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total: u64,
    pub read: u64,
    pub unread: u64,
    pub by_type: Vec<LabelCount>,
    pub by_category: Vec<LabelCount>,
    pub by_priority: Vec<LabelCount>,
}
