//! Background jobs processed by `jobs work`.

mod email_job;

pub use email_job::{build_message, email_job_handler, EmailAttachment, EmailJob};
