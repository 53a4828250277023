//! Seed command - Creates the default admin account.

use chrono::Utc;

use crate::config::Config;
use crate::domain::account::normalize_email;
use crate::domain::{BankDetails, BaseSalary, NewAccount, Password, Role};
use crate::errors::AppResult;
use crate::infra::{AccountRepository, AccountStore, Database};

/// Execute the seed command
pub async fn execute(config: Config) -> AppResult<()> {
    let db = Database::connect(&config).await?;
    let accounts = AccountStore::new(db.get_connection());

    let created = ensure_admin(&accounts, &config).await?;
    if created {
        println!("Default admin created: {}", config.admin_email);
    } else {
        println!("Admin {} already exists, nothing to do", config.admin_email);
    }
    Ok(())
}

/// Creates the configured admin unless an account with that email exists.
/// Returns whether an account was created.
pub async fn ensure_admin(accounts: &dyn AccountRepository, config: &Config) -> AppResult<bool> {
    let email = normalize_email(&config.admin_email);
    if accounts.find_by_email(&email).await?.is_some() {
        return Ok(false);
    }

    let admin = accounts
        .create(NewAccount {
            name: "System Administrator".to_string(),
            email,
            password_hash: Password::new(config.admin_password())?.into_string(),
            role: Role::Admin,
            department: Some("Administration".to_string()),
            position: Some("Administrator".to_string()),
            joining_date: Some(Utc::now().date_naive()),
            salary: BaseSalary::default(),
            bank_details: BankDetails::default(),
        })
        .await?;

    tracing::info!(account_id = %admin.id, email = %admin.email, "Default admin created");
    Ok(true)
}
