//! End-to-end service flows over in-memory infrastructure.

mod common;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::Harness;
use payroll_api::domain::{
    Account, Actor, Allowances, BankDetails, BaseSalary, Deductions, Expense, ExpenseCategory,
    ExpenseChanges, ExpenseDecision, ExpenseStatus, NewAccount, NotificationCategory, PayPeriod,
    Role, SlipInput, SlipStatus, WorkingDays,
};
use payroll_api::errors::AppError;
use payroll_api::infra::{AccountRepository, UnitOfWork};
use payroll_api::services::{AccountDraft, ExpenseSubmission, ServiceContainer};

async fn seed_admin(harness: &Harness) -> Actor {
    let admin: Account = harness
        .uow
        .accounts()
        .create(NewAccount {
            name: "Asha Admin".to_string(),
            email: "admin@company.com".to_string(),
            password_hash: "unused".to_string(),
            role: Role::Admin,
            department: None,
            position: None,
            joining_date: None,
            salary: BaseSalary::default(),
            bank_details: BankDetails::default(),
        })
        .await
        .unwrap();
    admin.actor()
}

async fn hire(harness: &Harness, admin: &Actor, email: &str, basic: Decimal) -> Account {
    harness
        .services
        .accounts()
        .create(
            admin,
            AccountDraft {
                name: "Ravi Kumar".to_string(),
                email: email.to_string(),
                password: "Secret123".to_string(),
                role: Role::Employee,
                department: Some("Engineering".to_string()),
                position: Some("Developer".to_string()),
                joining_date: None,
                salary: BaseSalary {
                    basic,
                    allowances: dec!(0),
                },
                bank_details: BankDetails::default(),
            },
        )
        .await
        .unwrap()
}

async fn submit_claim(harness: &Harness, employee: &Account) -> Expense {
    harness
        .services
        .expenses()
        .create(
            &employee.actor(),
            ExpenseSubmission {
                title: "Taxi to client".to_string(),
                description: "Taxi fare to the client office and back".to_string(),
                amount: dec!(640),
                category: ExpenseCategory::Travel,
                expense_date: Utc::now().date_naive(),
            },
            None,
        )
        .await
        .unwrap()
}

fn slip_input(employee: &Account) -> SlipInput {
    let year = Utc::now().year();
    SlipInput {
        employee_id: employee.id,
        period: PayPeriod::new(1, year, year).unwrap(),
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

#[tokio::test]
async fn approved_expense_notifies_the_employee() {
    let harness = Harness::new();
    let admin = seed_admin(&harness).await;
    let employee = hire(&harness, &admin, "ravi@company.com", dec!(40000)).await;
    assert_eq!(employee.employee_code.as_deref(), Some("EMP0001"));

    let submitted = harness
        .services
        .expenses()
        .create(
            &employee.actor(),
            ExpenseSubmission {
                title: "Printer paper".to_string(),
                description: "Two boxes of A4 paper for the team printer".to_string(),
                amount: dec!(1200),
                category: ExpenseCategory::OfficeSupplies,
                expense_date: Utc::now().date_naive(),
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(submitted.status, ExpenseStatus::Pending);

    let admin_inbox = harness.uow.notifications.for_account(admin.id);
    assert_eq!(admin_inbox.len(), 1);
    assert_eq!(admin_inbox[0].category, NotificationCategory::ExpenseSubmitted);

    let approved = harness
        .services
        .expenses()
        .decide(&admin, submitted.id, ExpenseDecision::Approve)
        .await
        .unwrap();

    assert_eq!(approved.status, ExpenseStatus::Approved);
    assert_eq!(approved.approved_by, Some(admin.id));
    assert!(approved.approved_at.is_some());

    let inbox = harness.uow.notifications.for_account(employee.id);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].category, NotificationCategory::ExpenseApproved);
    assert_eq!(inbox[0].related_id, Some(submitted.id));
}

#[tokio::test]
async fn decided_expense_cannot_be_decided_again() {
    let harness = Harness::new();
    let admin = seed_admin(&harness).await;
    let employee = hire(&harness, &admin, "ravi@company.com", dec!(40000)).await;

    let submitted = harness
        .services
        .expenses()
        .create(
            &employee.actor(),
            ExpenseSubmission {
                title: "Client lunch".to_string(),
                description: "Lunch with the onboarding client".to_string(),
                amount: dec!(850),
                category: ExpenseCategory::Food,
                expense_date: Utc::now().date_naive(),
            },
            None,
        )
        .await
        .unwrap();

    let rejected = harness
        .services
        .expenses()
        .decide(
            &admin,
            submitted.id,
            ExpenseDecision::Reject {
                reason: "Not a business expense".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, ExpenseStatus::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("Not a business expense")
    );

    let again = harness
        .services
        .expenses()
        .decide(&admin, submitted.id, ExpenseDecision::Approve)
        .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn decided_claims_are_frozen() {
    let harness = Harness::new();
    let admin = seed_admin(&harness).await;
    let employee = hire(&harness, &admin, "ravi@company.com", dec!(40000)).await;
    let expenses = harness.services.expenses();

    for decision in [
        ExpenseDecision::Approve,
        ExpenseDecision::Reject {
            reason: "Duplicate of an earlier claim".to_string(),
        },
    ] {
        let claim = submit_claim(&harness, &employee).await;
        let decided = expenses.decide(&admin, claim.id, decision).await.unwrap();
        assert_ne!(decided.status, ExpenseStatus::Pending);

        let update = expenses
            .update(
                &employee.actor(),
                claim.id,
                ExpenseChanges {
                    amount: Some(dec!(700)),
                    ..ExpenseChanges::default()
                },
            )
            .await;
        assert!(matches!(update, Err(AppError::Conflict(_))), "{:?}", decided.status);

        let approve = expenses
            .decide(&admin, claim.id, ExpenseDecision::Approve)
            .await;
        assert!(matches!(approve, Err(AppError::Conflict(_))), "{:?}", decided.status);

        let reject = expenses
            .decide(
                &admin,
                claim.id,
                ExpenseDecision::Reject {
                    reason: "Changed my mind".to_string(),
                },
            )
            .await;
        assert!(matches!(reject, Err(AppError::Conflict(_))), "{:?}", decided.status);

        let delete = expenses.delete(&employee.actor(), claim.id).await;
        assert!(matches!(delete, Err(AppError::Conflict(_))), "{:?}", decided.status);

        let unchanged = expenses.get(&admin, claim.id).await.unwrap();
        assert_eq!(unchanged.status, decided.status);
        assert_eq!(unchanged.amount, dec!(640));
    }
}

#[tokio::test]
async fn rejection_without_a_proper_reason_keeps_the_claim_pending() {
    let harness = Harness::new();
    let admin = seed_admin(&harness).await;
    let employee = hire(&harness, &admin, "ravi@company.com", dec!(40000)).await;
    let claim = submit_claim(&harness, &employee).await;

    for reason in [None, Some("no"), Some("   ")] {
        let decision = ExpenseDecision::from_request(ExpenseStatus::Rejected, reason);
        assert!(matches!(decision, Err(AppError::Validation(_))), "{:?}", reason);
    }

    let reread = harness.services.expenses().get(&admin, claim.id).await.unwrap();
    assert_eq!(reread.status, ExpenseStatus::Pending);
    assert!(reread.approved_by.is_none());
    assert!(reread.rejection_reason.is_none());
    assert!(harness.uow.notifications.for_account(employee.id).is_empty());
}

#[tokio::test]
async fn admins_cannot_submit_expenses() {
    let harness = Harness::new();
    let admin = seed_admin(&harness).await;

    let result = harness
        .services
        .expenses()
        .create(
            &admin,
            ExpenseSubmission {
                title: "Conference".to_string(),
                description: "Registration for the yearly conference".to_string(),
                amount: dec!(5000),
                category: ExpenseCategory::Training,
                expense_date: Utc::now().date_naive(),
            },
            None,
        )
        .await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn finalized_slip_is_locked() {
    let harness = Harness::new();
    let admin = seed_admin(&harness).await;
    let employee = hire(&harness, &admin, "ravi@company.com", dec!(50000)).await;
    let slips = harness.services.salary_slips();

    let draft = slips.create(&admin, slip_input(&employee)).await.unwrap();
    assert_eq!(draft.status, SlipStatus::Draft);
    assert_eq!(draft.gross_salary, dec!(70000));
    assert_eq!(draft.net_salary, dec!(65000));

    let finalized = slips.finalize(&admin, draft.id).await.unwrap();
    assert_eq!(finalized.status, SlipStatus::Finalized);
    assert_eq!(finalized.net_salary, dec!(65000));
    assert!(finalized.finalized_at.is_some());

    let again = slips.finalize(&admin, draft.id).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let duplicate = slips.create(&admin, slip_input(&employee)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn slip_document_is_generated_and_mailed() {
    let harness = Harness::new();
    let admin = seed_admin(&harness).await;
    let employee = hire(&harness, &admin, "ravi@company.com", dec!(50000)).await;
    let slips = harness.services.salary_slips();

    let draft = slips.create(&admin, slip_input(&employee)).await.unwrap();

    let premature = slips.send(&admin, draft.id).await;
    assert!(matches!(premature, Err(AppError::Conflict(_))));

    slips.finalize(&admin, draft.id).await.unwrap();
    let with_document = slips.generate_document(&admin, draft.id).await.unwrap();
    let path = with_document.document_path.expect("document path");
    let bytes = harness.files.get(&path).expect("stored document");
    assert!(bytes.starts_with(b"%PDF"));

    let sent = slips.send(&admin, draft.id).await.unwrap();
    assert_eq!(sent.status, SlipStatus::Sent);

    let outbox = harness.outbox.sent.lock().unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, "ravi@company.com");
    let attachment = outbox[0].attachment.as_ref().expect("attachment");
    assert_eq!(attachment.stored_path, path);
    assert_eq!(attachment.content_type, "application/pdf");

    let downloaded = slips.download(&employee.actor(), draft.id).await.unwrap();
    assert_eq!(downloaded.bytes, bytes);
}

#[tokio::test]
async fn employees_only_see_their_own_slips() {
    let harness = Harness::new();
    let admin = seed_admin(&harness).await;
    let ravi = hire(&harness, &admin, "ravi@company.com", dec!(50000)).await;
    let meera = hire(&harness, &admin, "meera@company.com", dec!(50000)).await;
    let slips = harness.services.salary_slips();

    let slip = slips.create(&admin, slip_input(&ravi)).await.unwrap();

    let forbidden = slips.get(&meera.actor(), slip.id).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    let own = slips.get(&ravi.actor(), slip.id).await.unwrap();
    assert_eq!(own.id, slip.id);

    let generated = harness.uow.notifications.for_account(ravi.id);
    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].category, NotificationCategory::SalaryGenerated);
}
