//! Authentication service - Registration, login and bearer tokens.
//!
//! Passwords are hashed by the domain `Password` value object; login runs a
//! full hash verification even for unknown emails.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Config, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::account::{
    normalize_email, validate_department, validate_name, validate_position,
};
use crate::domain::{
    Account, AccountResponse, Actor, BankDetails, BaseSalary, NewAccount, Password, Role,
};
use crate::errors::{AppError, AppResult, AuthError};
use crate::infra::UnitOfWork;

/// JWT claims payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful authentication
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token lifetime in seconds
    #[schema(example = 604800)]
    pub expires_in: i64,
}

/// Account plus a fresh token, returned by register and login.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: AccountResponse,
    #[serde(flatten)]
    pub token: TokenResponse,
}

/// Self-service registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: Option<String>,
    pub position: Option<String>,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new employee account
    async fn register(&self, registration: Registration) -> AppResult<AuthSession>;

    /// Login and return the account with a JWT token
    async fn login(&self, email: String, password: String) -> AppResult<AuthSession>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Resolve a bearer token to an active account
    async fn authenticate(&self, token: &str) -> AppResult<Account>;

    async fn change_password(
        &self,
        actor: &Actor,
        current_password: String,
        new_password: String,
    ) -> AppResult<()>;

    /// New token for an already authenticated caller
    fn refresh(&self, actor: &Actor) -> AppResult<TokenResponse>;
}

/// Generate JWT token for an account
fn generate_token(id: Uuid, email: &str, role: Role, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: id,
        email: email.to_string(),
        role: role.to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
    })
}

/// Verify JWT token and extract claims; expiry is told apart from other failures
fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )
    .map_err(AuthError::from)?;

    Ok(token_data.claims)
}

fn session(account: Account, config: &Config) -> AppResult<AuthSession> {
    let token = generate_token(account.id, &account.email, account.role, config)?;
    Ok(AuthSession {
        user: AccountResponse::from(account),
        token,
    })
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    /// Create new auth service instance with Unit of Work
    pub fn new(uow: Arc<U>, config: Config) -> Self {
        Self { uow, config }
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> AuthService for Authenticator<U> {
    async fn register(&self, registration: Registration) -> AppResult<AuthSession> {
        let email = normalize_email(&registration.email);
        if self.uow.accounts().find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let password_hash = Password::new(&registration.password)?.into_string();
        let account = self
            .uow
            .accounts()
            .create(NewAccount {
                name: validate_name(&registration.name)?,
                email,
                password_hash,
                role: Role::Employee,
                department: validate_department(registration.department)?,
                position: validate_position(registration.position)?,
                joining_date: None,
                salary: BaseSalary::default(),
                bank_details: BankDetails::default(),
            })
            .await?;

        tracing::info!(
            account_id = %account.id,
            code = ?account.employee_code,
            "Account registered"
        );
        session(account, &self.config)
    }

    async fn login(&self, email: String, password: String) -> AppResult<AuthSession> {
        let account = self
            .uow
            .accounts()
            .find_by_email(&normalize_email(&email))
            .await?;

        // Unknown emails verify against a dummy hash so both paths cost the same.
        let stored = match &account {
            Some(account) => Password::from_hash(account.password_hash.clone()),
            None => Password::dummy(),
        };
        let password_valid = stored.verify(&password);

        let account = match account {
            Some(account) if password_valid => account,
            _ => return Err(AppError::InvalidCredentials),
        };
        if !account.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        self.uow.accounts().touch_last_login(account.id).await?;
        tracing::info!(account_id = %account.id, "Login succeeded");
        session(account, &self.config)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }

    async fn authenticate(&self, token: &str) -> AppResult<Account> {
        let claims = self.verify_token(token)?;
        let account = self
            .uow
            .accounts()
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !account.is_active {
            return Err(AuthError::AccountInactive.into());
        }
        Ok(account)
    }

    async fn change_password(
        &self,
        actor: &Actor,
        current_password: String,
        new_password: String,
    ) -> AppResult<()> {
        let account = self
            .uow
            .accounts()
            .find_by_id(actor.id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !Password::from_hash(account.password_hash).verify(&current_password) {
            return Err(AppError::validation("Current password is incorrect"));
        }

        let password_hash = Password::new(&new_password)?.into_string();
        self.uow
            .accounts()
            .set_password(actor.id, password_hash)
            .await?;

        tracing::info!(account_id = %actor.id, "Password changed");
        Ok(())
    }

    fn refresh(&self, actor: &Actor) -> AppResult<TokenResponse> {
        generate_token(actor.id, &actor.email, actor.role, &self.config)
    }
}
