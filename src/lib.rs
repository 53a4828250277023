//! Payroll API - REST backend for a small company's payroll.
//!
//! Admins manage the employee directory, review expense claims and issue
//! monthly salary slips (PDF + email); employees submit claims, download
//! their slips and follow in-app notifications.
//!
//! # Architecture Layers
//!
//! - **cli** / **commands**: `serve`, `migrate`, `jobs`, `seed`
//! - **config**: Environment configuration and constants
//! - **domain**: Entities, validation rules, salary arithmetic, amount in words
//! - **services**: Use cases with role checks and side effects
//! - **infra**: PostgreSQL repositories, Redis, file storage, email queue
//! - **render**: Salary slip PDF and email bodies
//! - **jobs**: Background email delivery
//! - **api**: HTTP handlers, middleware, routes and OpenAPI
//! - **types**: Pagination and response envelopes
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! payroll-api migrate up
//! payroll-api seed
//! payroll-api serve --port 5000
//! payroll-api jobs work
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod jobs;
pub mod render;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Account, Actor, Password, Role};
pub use errors::{AppError, AppResult};
pub use infra::Cache;
