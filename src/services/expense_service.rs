//! Expense service - Claim submission, review and receipts.
//!
//! Status changes go through the store's conditional updates, so a claim
//! decided concurrently by two admins is decided exactly once. A receipt is
//! written before the claim row; if the insert fails the file is removed.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::notification_service::{deliver, deliver_many};
use crate::config::{RECEIPTS_DIR, RECEIPT_MIME_TYPES};
use crate::domain::expense::{not_pending, validate_comment};
use crate::domain::{
    Actor, Expense, ExpenseCategory, ExpenseChanges, ExpenseComment, ExpenseDecision,
    ExpenseDraft, ExpenseFilter, ExpenseStats, NewExpense, NewNotification, Receipt, Role,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{FileStore, UnitOfWork};
use crate::types::{Paginated, PaginationParams};

/// Claim fields as submitted
#[derive(Debug, Clone)]
pub struct ExpenseSubmission {
    pub title: String,
    pub description: String,
    pub amount: Decimal,
    pub category: ExpenseCategory,
    pub expense_date: NaiveDate,
}

/// Uploaded receipt before it is stored
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Stored receipt read back for download
#[derive(Debug, Clone)]
pub struct ReceiptFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Expense service trait for dependency injection.
#[async_trait]
pub trait ExpenseService: Send + Sync {
    /// Employee only; the claim starts pending and every active admin is notified
    async fn create(
        &self,
        actor: &Actor,
        submission: ExpenseSubmission,
        receipt: Option<ReceiptUpload>,
    ) -> AppResult<Expense>;

    /// Admins see every claim, employees only their own
    async fn list(
        &self,
        actor: &Actor,
        filter: ExpenseFilter,
        page: PaginationParams,
    ) -> AppResult<Paginated<Expense>>;

    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Expense>;

    /// Owner only, while pending
    async fn update(&self, actor: &Actor, id: Uuid, changes: ExpenseChanges)
        -> AppResult<Expense>;

    /// Admin only, while pending; notifies the owner
    async fn decide(&self, actor: &Actor, id: Uuid, decision: ExpenseDecision)
        -> AppResult<Expense>;

    /// Owner or admin, in any state; returns the claim with its thread
    async fn comment(&self, actor: &Actor, id: Uuid, message: String) -> AppResult<Expense>;

    /// Owner only, while pending; removes the receipt file
    async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()>;

    /// Caller's own figures for employees, everyone's for admins
    async fn stats(&self, actor: &Actor) -> AppResult<ExpenseStats>;

    async fn receipt(&self, actor: &Actor, id: Uuid) -> AppResult<ReceiptFile>;
}

/// Concrete implementation of ExpenseService using Unit of Work.
pub struct ExpenseDesk<U: UnitOfWork> {
    uow: Arc<U>,
    files: Arc<dyn FileStore>,
    max_file_size: usize,
}

impl<U: UnitOfWork> ExpenseDesk<U> {
    pub fn new(uow: Arc<U>, files: Arc<dyn FileStore>, max_file_size: usize) -> Self {
        Self {
            uow,
            files,
            max_file_size,
        }
    }

    async fn find(&self, id: Uuid) -> AppResult<Expense> {
        self.uow
            .expenses()
            .find_by_id(id)
            .await?
            .ok_or_not_found("Expense")
    }

    fn check_upload(&self, upload: &ReceiptUpload) -> AppResult<()> {
        if !RECEIPT_MIME_TYPES.contains(&upload.content_type.as_str()) {
            return Err(AppError::validation(
                "Only JPEG, PNG and PDF receipts are allowed",
            ));
        }
        if upload.bytes.is_empty() {
            return Err(AppError::validation("Receipt file is empty"));
        }
        if upload.bytes.len() > self.max_file_size {
            return Err(AppError::validation(format!(
                "Receipt exceeds the {} byte limit",
                self.max_file_size
            )));
        }
        Ok(())
    }

    async fn store_receipt(&self, upload: ReceiptUpload) -> AppResult<Receipt> {
        self.check_upload(&upload)?;

        let filename = format!(
            "receipt-{}{}",
            Uuid::new_v4().simple(),
            receipt_extension(&upload.original_name, &upload.content_type)
        );
        let size = upload.bytes.len() as i64;
        let path = self.files.save(RECEIPTS_DIR, &filename, upload.bytes).await?;

        Ok(Receipt {
            filename,
            original_name: upload.original_name,
            path,
            size,
            mime_type: upload.content_type,
        })
    }

    async fn discard_file(&self, path: &str) {
        if let Err(e) = self.files.remove(path).await {
            tracing::warn!(path = %path, error = %e, "Failed to remove stored file");
        }
    }

    async fn notify_admins(&self, expense: &Expense, submitter: &str) {
        let admins = match self.uow.accounts().active_ids(Some(Role::Admin)).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(expense_id = %expense.id, error = %e, "Failed to load admins");
                return;
            }
        };
        let batch = admins
            .into_iter()
            .map(|admin_id| NewNotification::expense_submitted(admin_id, expense, submitter))
            .collect();
        deliver_many(self.uow.notifications().as_ref(), batch).await;
    }
}

/// Extension from the original name, else from the content type.
fn receipt_extension(original_name: &str, content_type: &str) -> String {
    let from_name = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "pdf"));

    match from_name {
        Some(ext) => format!(".{}", ext),
        None => match content_type {
            "application/pdf" => ".pdf".to_string(),
            "image/png" => ".png".to_string(),
            _ => ".jpg".to_string(),
        },
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> ExpenseService for ExpenseDesk<U> {
    async fn create(
        &self,
        actor: &Actor,
        submission: ExpenseSubmission,
        receipt: Option<ReceiptUpload>,
    ) -> AppResult<Expense> {
        actor.require_employee()?;
        let draft = ExpenseDraft::new(
            &submission.title,
            &submission.description,
            submission.amount,
            submission.category,
            submission.expense_date,
            Utc::now().date_naive(),
        )?;

        let receipt = match receipt {
            Some(upload) => Some(self.store_receipt(upload).await?),
            None => None,
        };
        let stored_path = receipt.as_ref().map(|r| r.path.clone());

        let created = self
            .uow
            .expenses()
            .create(NewExpense {
                employee_id: actor.id,
                draft,
                receipt,
            })
            .await;

        let expense = match created {
            Ok(expense) => expense,
            Err(e) => {
                if let Some(path) = stored_path {
                    self.discard_file(&path).await;
                }
                return Err(e);
            }
        };

        tracing::info!(
            expense_id = %expense.id,
            employee_id = %actor.id,
            amount = %expense.amount,
            "Expense submitted"
        );
        self.notify_admins(&expense, &actor.name).await;
        Ok(expense)
    }

    async fn list(
        &self,
        actor: &Actor,
        mut filter: ExpenseFilter,
        page: PaginationParams,
    ) -> AppResult<Paginated<Expense>> {
        if !actor.is_admin() {
            filter.employee_id = Some(actor.id);
        }
        filter.validate()?;

        let (expenses, total) = self.uow.expenses().list(filter, page).await?;
        Ok(Paginated::new(expenses, page, total))
    }

    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Expense> {
        let expense = self.find(id).await?;
        actor.require_owner_or_admin(expense.employee_id)?;
        Ok(expense)
    }

    async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: ExpenseChanges,
    ) -> AppResult<Expense> {
        let expense = self.find(id).await?;
        actor.require_owner(expense.employee_id)?;
        expense.ensure_pending()?;

        let changes = changes.validated(Utc::now().date_naive())?;
        if changes.is_empty() {
            return Ok(expense);
        }

        let updated = self
            .uow
            .expenses()
            .update_pending(id, changes)
            .await?
            .ok_or_else(not_pending)?;
        tracing::info!(expense_id = %id, "Expense updated");
        Ok(updated)
    }

    async fn decide(
        &self,
        actor: &Actor,
        id: Uuid,
        decision: ExpenseDecision,
    ) -> AppResult<Expense> {
        actor.require_admin()?;
        let expense = self.find(id).await?;
        expense.ensure_pending()?;

        let decided = self
            .uow
            .expenses()
            .decide(id, decision.clone(), actor.id, Utc::now())
            .await?
            .ok_or_else(not_pending)?;

        tracing::info!(
            expense_id = %id,
            status = decided.status.as_str(),
            decided_by = %actor.id,
            "Expense decided"
        );

        let notification = match decision {
            ExpenseDecision::Approve => NewNotification::expense_approved(&decided, &actor.name),
            ExpenseDecision::Reject { .. } => NewNotification::expense_rejected(&decided),
        };
        deliver(self.uow.notifications().as_ref(), notification).await;
        Ok(decided)
    }

    async fn comment(&self, actor: &Actor, id: Uuid, message: String) -> AppResult<Expense> {
        let message = validate_comment(&message)?;
        let expense = self.find(id).await?;
        actor.require_owner_or_admin(expense.employee_id)?;

        let comment: ExpenseComment = self
            .uow
            .expenses()
            .add_comment(id, actor.id, message)
            .await?;
        tracing::debug!(expense_id = %id, comment_id = %comment.id, "Comment added");

        let mut expense = expense;
        expense.comments.push(comment);
        Ok(expense)
    }

    async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        let expense = self.find(id).await?;
        actor.require_owner(expense.employee_id)?;
        expense.ensure_pending()?;

        if !self.uow.expenses().delete_pending(id).await? {
            return Err(not_pending());
        }
        if let Some(receipt) = &expense.receipt {
            self.discard_file(&receipt.path).await;
        }

        tracing::info!(expense_id = %id, "Expense deleted");
        Ok(())
    }

    async fn stats(&self, actor: &Actor) -> AppResult<ExpenseStats> {
        let scope = (!actor.is_admin()).then_some(actor.id);
        self.uow
            .expenses()
            .stats(scope, Utc::now().year())
            .await
    }

    async fn receipt(&self, actor: &Actor, id: Uuid) -> AppResult<ReceiptFile> {
        let expense = self.find(id).await?;
        actor.require_owner_or_admin(expense.employee_id)?;
        let receipt = expense.receipt.ok_or_not_found("Receipt")?;

        let bytes = self.files.read(&receipt.path).await?;
        Ok(ReceiptFile {
            file_name: receipt.original_name,
            content_type: receipt.mime_type,
            bytes,
        })
    }
}
