//! Salary slip rendering: the PDF document and the summary email.
//!
//! [`layout`] turns a slip into an ordered list of blocks, independent of the
//! output format. [`pdf`] paginates those blocks onto A4 pages.

pub mod email;
pub mod layout;
pub mod pdf;

use chrono::{DateTime, Utc};

use crate::domain::{Account, SalarySlip};
use crate::errors::AppResult;

pub use email::{salary_slip_email, SlipEmail};
pub use layout::{slip_layout, Block};
pub use pdf::PdfRenderer;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Everything printed on a slip.
#[derive(Debug, Clone)]
pub struct SlipContext {
    pub slip: SalarySlip,
    pub employee: Account,
    /// Name of the admin who generated the slip
    pub generated_by: String,
    pub company_name: String,
    pub generated_at: DateTime<Utc>,
}

/// Document renderer abstraction for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait DocumentRenderer: Send + Sync {
    /// PDF bytes for one salary slip.
    fn render_slip(&self, context: &SlipContext) -> AppResult<Vec<u8>>;
}
