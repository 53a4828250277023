//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod account;
pub mod expense;
pub mod expense_comment;
pub mod notification;
pub mod salary_slip;
