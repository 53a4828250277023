//! Salary service - Slip lifecycle, documents and delivery.
//!
//! A slip moves draft → finalized → sent and never back. Amounts change only
//! while it is a draft. Sending needs a rendered document, which is attached
//! to the queued email by stored path.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::notification_service::deliver;
use crate::config::SALARY_SLIPS_DIR;
use crate::domain::{
    Account, Actor, EmployeeSummary, NewNotification, NewSalarySlip, SalarySlip, SalaryStats,
    SlipChanges, SlipFilter, SlipInput, SlipStatus,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{FileStore, Mailer, UnitOfWork};
use crate::jobs::{EmailAttachment, EmailJob};
use crate::render::{salary_slip_email, DocumentRenderer, SlipContext};
use crate::types::{Paginated, PaginationParams};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Rendered slip ready for download
#[derive(Debug, Clone)]
pub struct SlipDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One employee with their slips, most recent period first
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSlips {
    pub employee: EmployeeSummary,
    pub salary_slips: Vec<SalarySlip>,
}

/// Salary service trait for dependency injection.
#[async_trait]
pub trait SalaryService: Send + Sync {
    /// Admin only; creates a draft and notifies the employee
    async fn create(&self, actor: &Actor, input: SlipInput) -> AppResult<SalarySlip>;

    /// Admins see every slip, employees only their own
    async fn list(
        &self,
        actor: &Actor,
        filter: SlipFilter,
        page: PaginationParams,
    ) -> AppResult<Paginated<SalarySlip>>;

    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<SalarySlip>;

    /// Admin only, draft only; components merge and totals are recomputed
    async fn update(&self, actor: &Actor, id: Uuid, changes: SlipChanges)
        -> AppResult<SalarySlip>;

    async fn finalize(&self, actor: &Actor, id: Uuid) -> AppResult<SalarySlip>;

    /// Render and store the PDF, in any status
    async fn generate_document(&self, actor: &Actor, id: Uuid) -> AppResult<SalarySlip>;

    /// Finalized slips with a document only; queues the email and marks the slip sent
    async fn send(&self, actor: &Actor, id: Uuid) -> AppResult<SalarySlip>;

    async fn download(&self, actor: &Actor, id: Uuid) -> AppResult<SlipDocument>;

    /// Admin only, draft only; removes the stored document
    async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()>;

    async fn stats(&self, actor: &Actor) -> AppResult<SalaryStats>;

    async fn for_employee(
        &self,
        actor: &Actor,
        employee_id: Uuid,
        year: Option<i32>,
    ) -> AppResult<EmployeeSlips>;
}

/// Concrete implementation of SalaryService using Unit of Work.
pub struct SalaryOffice<U: UnitOfWork> {
    uow: Arc<U>,
    files: Arc<dyn FileStore>,
    renderer: Arc<dyn DocumentRenderer>,
    mailer: Arc<dyn Mailer>,
    company_name: String,
}

impl<U: UnitOfWork> SalaryOffice<U> {
    pub fn new(
        uow: Arc<U>,
        files: Arc<dyn FileStore>,
        renderer: Arc<dyn DocumentRenderer>,
        mailer: Arc<dyn Mailer>,
        company_name: impl Into<String>,
    ) -> Self {
        Self {
            uow,
            files,
            renderer,
            mailer,
            company_name: company_name.into(),
        }
    }

    async fn find(&self, id: Uuid) -> AppResult<SalarySlip> {
        self.uow
            .salary_slips()
            .find_by_id(id)
            .await?
            .ok_or_not_found("Salary slip")
    }

    async fn employee(&self, id: Uuid) -> AppResult<Account> {
        self.uow
            .accounts()
            .find_by_id(id)
            .await?
            .ok_or_not_found("Employee")
    }

    async fn context(&self, slip: SalarySlip, employee: Account) -> AppResult<SlipContext> {
        let generated_by = self
            .uow
            .accounts()
            .find_by_id(slip.generated_by)
            .await?
            .map(|admin| admin.name)
            .unwrap_or_else(|| "Administrator".to_string());

        Ok(SlipContext {
            slip,
            employee,
            generated_by,
            company_name: self.company_name.clone(),
            generated_at: Utc::now(),
        })
    }

    async fn render(&self, context: SlipContext) -> AppResult<Vec<u8>> {
        let renderer = self.renderer.clone();
        tokio::task::spawn_blocking(move || renderer.render_slip(&context))
            .await
            .map_err(|e| AppError::internal(format!("PDF rendering task failed: {}", e)))?
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> SalaryService for SalaryOffice<U> {
    async fn create(&self, actor: &Actor, input: SlipInput) -> AppResult<SalarySlip> {
        actor.require_admin()?;
        let breakdown = input.validate()?;

        let employee = self.employee(input.employee_id).await?;
        if !employee.is_employee() {
            return Err(AppError::validation(
                "Salary slips can only be generated for employees",
            ));
        }
        if self
            .uow
            .salary_slips()
            .find_for_period(employee.id, input.period)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "Salary slip already exists for this period",
            ));
        }

        let slip = self
            .uow
            .salary_slips()
            .create(NewSalarySlip {
                input,
                generated_by: actor.id,
                breakdown,
            })
            .await?;

        tracing::info!(
            slip_id = %slip.id,
            employee_id = %slip.employee_id,
            period = %slip.period(),
            net = %slip.net_salary,
            "Salary slip created"
        );
        deliver(
            self.uow.notifications().as_ref(),
            NewNotification::salary_generated(&slip),
        )
        .await;
        Ok(slip)
    }

    async fn list(
        &self,
        actor: &Actor,
        mut filter: SlipFilter,
        page: PaginationParams,
    ) -> AppResult<Paginated<SalarySlip>> {
        if !actor.is_admin() {
            filter.employee_id = Some(actor.id);
        }
        let (slips, total) = self.uow.salary_slips().list(filter, page).await?;
        Ok(Paginated::new(slips, page, total))
    }

    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<SalarySlip> {
        let slip = self.find(id).await?;
        actor.require_owner_or_admin(slip.employee_id)?;
        Ok(slip)
    }

    async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: SlipChanges,
    ) -> AppResult<SalarySlip> {
        actor.require_admin()?;
        let slip = self.find(id).await?;
        slip.ensure_draft()?;

        let revision = changes.apply_to(&slip)?;
        let updated = self
            .uow
            .salary_slips()
            .update_draft(id, revision)
            .await?
            .ok_or_else(|| AppError::conflict("Salary slip is no longer a draft"))?;

        tracing::info!(slip_id = %id, net = %updated.net_salary, "Salary slip updated");
        Ok(updated)
    }

    async fn finalize(&self, actor: &Actor, id: Uuid) -> AppResult<SalarySlip> {
        actor.require_admin()?;
        let slip = self.find(id).await?;
        slip.ensure_draft()?;

        let finalized = self
            .uow
            .salary_slips()
            .transition(id, SlipStatus::Draft, SlipStatus::Finalized)
            .await?
            .ok_or_else(|| AppError::conflict("Salary slip is no longer a draft"))?;

        tracing::info!(slip_id = %id, by = %actor.id, "Salary slip finalized");
        Ok(finalized)
    }

    async fn generate_document(&self, actor: &Actor, id: Uuid) -> AppResult<SalarySlip> {
        actor.require_admin()?;
        let slip = self.find(id).await?;
        let employee = self.employee(slip.employee_id).await?;

        let file_name = slip.document_file_name(employee.code_or_placeholder());
        let context = self.context(slip, employee).await?;
        let bytes = self.render(context).await?;
        let size = bytes.len();

        let path = self.files.save(SALARY_SLIPS_DIR, &file_name, bytes).await?;
        let updated = self
            .uow
            .salary_slips()
            .set_document(id, path)
            .await?
            .ok_or_not_found("Salary slip")?;

        tracing::info!(slip_id = %id, bytes = size, "Salary slip document generated");
        Ok(updated)
    }

    async fn send(&self, actor: &Actor, id: Uuid) -> AppResult<SalarySlip> {
        actor.require_admin()?;
        let slip = self.find(id).await?;
        slip.ensure_status(SlipStatus::Finalized)?;
        let stored_path = slip.document_path.clone().ok_or_else(|| {
            AppError::bad_request("Generate the salary slip document before sending it")
        })?;
        let employee = self.employee(slip.employee_id).await?;

        let sent = self
            .uow
            .salary_slips()
            .transition(id, SlipStatus::Finalized, SlipStatus::Sent)
            .await?
            .ok_or_else(|| AppError::conflict("Salary slip is no longer finalized"))?;

        let attachment = EmailAttachment {
            file_name: sent.download_name(employee.code_or_placeholder()),
            content_type: PDF_CONTENT_TYPE.to_string(),
            stored_path,
        };
        let to = employee.email.clone();
        let context = self.context(sent.clone(), employee).await?;
        let email = salary_slip_email(&context);
        let job = EmailJob::new(to, email.subject, email.html).with_attachment(attachment);

        // The slip stays sent if queueing fails; the failure is logged for a resend.
        if let Err(e) = self.mailer.enqueue(job).await {
            tracing::error!(slip_id = %id, error = %e, "Failed to queue salary slip email");
        }

        tracing::info!(slip_id = %id, by = %actor.id, "Salary slip sent");
        deliver(
            self.uow.notifications().as_ref(),
            NewNotification::salary_sent(&sent),
        )
        .await;
        Ok(sent)
    }

    async fn download(&self, actor: &Actor, id: Uuid) -> AppResult<SlipDocument> {
        let slip = self.find(id).await?;
        actor.require_owner_or_admin(slip.employee_id)?;
        let path = slip
            .document_path
            .as_deref()
            .ok_or_not_found("Salary slip document")?;
        let employee = self.employee(slip.employee_id).await?;

        let bytes = self.files.read(path).await?;
        Ok(SlipDocument {
            file_name: slip.download_name(employee.code_or_placeholder()),
            bytes,
        })
    }

    async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        let slip = self.find(id).await?;
        slip.ensure_draft()?;

        if !self.uow.salary_slips().delete_draft(id).await? {
            return Err(AppError::conflict("Salary slip is no longer a draft"));
        }
        if let Some(path) = slip.document_path.as_deref() {
            if let Err(e) = self.files.remove(path).await {
                tracing::warn!(path = %path, error = %e, "Failed to remove salary slip document");
            }
        }

        tracing::info!(slip_id = %id, by = %actor.id, "Salary slip deleted");
        Ok(())
    }

    async fn stats(&self, actor: &Actor) -> AppResult<SalaryStats> {
        let scope = (!actor.is_admin()).then_some(actor.id);
        self.uow
            .salary_slips()
            .stats(scope, Utc::now().year())
            .await
    }

    async fn for_employee(
        &self,
        actor: &Actor,
        employee_id: Uuid,
        year: Option<i32>,
    ) -> AppResult<EmployeeSlips> {
        actor.require_admin()?;
        let employee = self.employee(employee_id).await?;
        let salary_slips = self
            .uow
            .salary_slips()
            .list_for_employee(employee_id, year)
            .await?;

        Ok(EmployeeSlips {
            employee: EmployeeSummary::from(employee),
            salary_slips,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Allowances, Deductions, PayPeriod, Role, WorkingDays};
    use crate::infra::{
        MockAccountRepository, MockFileStore, MockMailer, MockNotificationRepository,
        MockSalarySlipRepository,
    };
    use crate::render::MockDocumentRenderer;
    use crate::services::test_support::{account, actor, slip, TestUow};
    use rust_decimal_macros::dec;

    struct Parts {
        uow: TestUow,
        files: MockFileStore,
        renderer: MockDocumentRenderer,
        mailer: MockMailer,
    }

    impl Parts {
        fn new() -> Self {
            Self {
                uow: TestUow::default(),
                files: MockFileStore::new(),
                renderer: MockDocumentRenderer::new(),
                mailer: MockMailer::new(),
            }
        }

        fn build(self) -> SalaryOffice<TestUow> {
            SalaryOffice::new(
                Arc::new(self.uow),
                Arc::new(self.files),
                Arc::new(self.renderer),
                Arc::new(self.mailer),
                "ACME PAYROLL",
            )
        }
    }

    fn input(employee_id: Uuid) -> SlipInput {
        SlipInput {
            employee_id,
            period: PayPeriod::new(6, 2024, 2024).unwrap(),
            basic_salary: dec!(50000),
            allowances: Allowances {
                hra: dec!(20000),
                ..Allowances::default()
            },
            deductions: Deductions {
                tax: dec!(5000),
                ..Deductions::default()
            },
            working_days: WorkingDays {
                total: 22,
                worked: 22,
            },
            notes: None,
        }
    }

    fn accounts_returning(account: Account) -> MockAccountRepository {
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(account.clone())));
        accounts
    }

    #[tokio::test]
    async fn test_create_requires_employee_target() {
        let admin_target = account(Role::Admin);
        let id = admin_target.id;

        let mut parts = Parts::new();
        parts.uow.accounts = Arc::new(accounts_returning(admin_target));

        let err = parts
            .build()
            .create(&actor(Role::Admin), input(id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_period_is_conflict() {
        let employee = account(Role::Employee);
        let id = employee.id;
        let existing = slip(id, SlipStatus::Draft);

        let mut slips = MockSalarySlipRepository::new();
        slips
            .expect_find_for_period()
            .returning(move |_, _| Ok(Some(existing.clone())));
        slips.expect_create().never();

        let mut parts = Parts::new();
        parts.uow.accounts = Arc::new(accounts_returning(employee));
        parts.uow.salary_slips = Arc::new(slips);

        let err = parts
            .build()
            .create(&actor(Role::Admin), input(id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_computes_net_and_notifies() {
        let employee = account(Role::Employee);
        let id = employee.id;

        let mut slips = MockSalarySlipRepository::new();
        slips.expect_find_for_period().returning(|_, _| Ok(None));
        slips
            .expect_create()
            .withf(|new| new.breakdown.net_salary == dec!(65000))
            .returning(|new| Ok(slip(new.input.employee_id, SlipStatus::Draft)));

        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_create()
            .withf(move |n| n.account_id == id && n.title == "Salary Slip Generated")
            .times(1)
            .returning(|_| Err(AppError::internal("feed unavailable")));

        let mut parts = Parts::new();
        parts.uow.accounts = Arc::new(accounts_returning(employee));
        parts.uow.salary_slips = Arc::new(slips);
        parts.uow.notifications = Arc::new(notifications);

        let created = parts
            .build()
            .create(&actor(Role::Admin), input(id))
            .await
            .unwrap();
        assert_eq!(created.net_salary, dec!(65000));
    }

    #[tokio::test]
    async fn test_finalize_twice_is_conflict() {
        let finalized = slip(Uuid::new_v4(), SlipStatus::Finalized);
        let id = finalized.id;

        let mut slips = MockSalarySlipRepository::new();
        slips
            .expect_find_by_id()
            .returning(move |_| Ok(Some(finalized.clone())));
        slips.expect_transition().never();

        let mut parts = Parts::new();
        parts.uow.salary_slips = Arc::new(slips);

        let err = parts
            .build()
            .finalize(&actor(Role::Admin), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_send_requires_document() {
        let finalized = slip(Uuid::new_v4(), SlipStatus::Finalized);
        let id = finalized.id;

        let mut slips = MockSalarySlipRepository::new();
        slips
            .expect_find_by_id()
            .returning(move |_| Ok(Some(finalized.clone())));
        slips.expect_transition().never();

        let mut parts = Parts::new();
        parts.uow.salary_slips = Arc::new(slips);
        parts.mailer.expect_enqueue().never();

        let err = parts.build().send(&actor(Role::Admin), id).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_send_draft_is_conflict() {
        let mut draft = slip(Uuid::new_v4(), SlipStatus::Draft);
        draft.document_path = Some("salary-slips/x.pdf".into());
        let id = draft.id;

        let mut slips = MockSalarySlipRepository::new();
        slips
            .expect_find_by_id()
            .returning(move |_| Ok(Some(draft.clone())));

        let mut parts = Parts::new();
        parts.uow.salary_slips = Arc::new(slips);

        let err = parts.build().send(&actor(Role::Admin), id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_send_queues_email_with_attachment() {
        let employee = account(Role::Employee);
        let mut finalized = slip(employee.id, SlipStatus::Finalized);
        finalized.document_path = Some("salary-slips/salary-slip-EMP0001-6-2024.pdf".into());
        let id = finalized.id;
        let mut sent = finalized.clone();
        sent.status = SlipStatus::Sent;

        let mut slips = MockSalarySlipRepository::new();
        slips
            .expect_find_by_id()
            .returning(move |_| Ok(Some(finalized.clone())));
        slips
            .expect_transition()
            .withf(|_, from, to| *from == SlipStatus::Finalized && *to == SlipStatus::Sent)
            .times(1)
            .returning(move |_, _, _| Ok(Some(sent.clone())));

        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_create()
            .withf(|n| n.title == "Salary Slip Sent")
            .times(1)
            .returning(|_| Err(AppError::internal("feed unavailable")));

        let mut parts = Parts::new();
        parts.uow.accounts = Arc::new(accounts_returning(employee));
        parts.uow.salary_slips = Arc::new(slips);
        parts.uow.notifications = Arc::new(notifications);
        parts
            .mailer
            .expect_enqueue()
            .withf(|job| {
                job.to == "asha@example.com"
                    && job.subject == "Salary Slip - June 2024"
                    && job.attachment.as_ref().is_some_and(|a| {
                        a.file_name == "SalarySlip_EMP0001_June_2024.pdf"
                            && a.stored_path == "salary-slips/salary-slip-EMP0001-6-2024.pdf"
                    })
            })
            .times(1)
            .returning(|_| Ok(()));

        let result = parts.build().send(&actor(Role::Admin), id).await.unwrap();
        assert_eq!(result.status, SlipStatus::Sent);
    }

    #[tokio::test]
    async fn test_generate_document_stores_rendered_pdf() {
        let employee = account(Role::Employee);
        let draft = slip(employee.id, SlipStatus::Draft);
        let id = draft.id;
        let mut with_document = draft.clone();
        with_document.document_path = Some("salary-slips/salary-slip-EMP0001-6-2024.pdf".into());

        let mut slips = MockSalarySlipRepository::new();
        slips
            .expect_find_by_id()
            .returning(move |_| Ok(Some(draft.clone())));
        slips
            .expect_set_document()
            .withf(|_, path| path == "salary-slips/salary-slip-EMP0001-6-2024.pdf")
            .returning(move |_, _| Ok(Some(with_document.clone())));

        let mut parts = Parts::new();
        parts.uow.accounts = Arc::new(accounts_returning(employee));
        parts.uow.salary_slips = Arc::new(slips);
        parts
            .renderer
            .expect_render_slip()
            .withf(|ctx| ctx.company_name == "ACME PAYROLL")
            .times(1)
            .returning(|_| Ok(b"%PDF-1.3".to_vec()));
        parts
            .files
            .expect_save()
            .withf(|dir, name, bytes| {
                dir == SALARY_SLIPS_DIR
                    && name == "salary-slip-EMP0001-6-2024.pdf"
                    && bytes.starts_with(b"%PDF")
            })
            .returning(|dir, name, _| Ok(format!("{}/{}", dir, name)));

        let updated = parts
            .build()
            .generate_document(&actor(Role::Admin), id)
            .await
            .unwrap();
        assert!(updated.document_path.is_some());
    }

    #[tokio::test]
    async fn test_employee_cannot_download_others_slip() {
        let other = slip(Uuid::new_v4(), SlipStatus::Sent);
        let id = other.id;

        let mut slips = MockSalarySlipRepository::new();
        slips
            .expect_find_by_id()
            .returning(move |_| Ok(Some(other.clone())));

        let mut parts = Parts::new();
        parts.uow.salary_slips = Arc::new(slips);

        let err = parts
            .build()
            .download(&actor(Role::Employee), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
}
