//! Email background job.
//!
//! Jobs are queued by the API and delivered by the `jobs work` process. When
//! `SMTP_HOST` is unset the message is logged instead of sent.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::config::DEFAULT_UPLOAD_DIR;
use crate::errors::{AppError, AppResult};
use crate::infra::{FileStore, LocalFileStore};

/// File attached to an outgoing email, read from the upload store at send time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAttachment {
    /// Name shown to the recipient
    pub file_name: String,
    pub content_type: String,
    /// Path relative to the upload root
    pub stored_path: String,
}

/// Email job payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailJob {
    /// Recipient email address
    pub to: String,
    /// Email subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    #[serde(default)]
    pub attachment: Option<EmailAttachment>,
}

impl EmailJob {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: EmailAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// SMTP configuration from environment, read per job.
struct EmailConfig {
    smtp_host: Option<String>,
    smtp_port: u16,
    smtp_user: Option<String>,
    smtp_pass: Option<String>,
    smtp_from: String,
    smtp_tls: bool,
    upload_dir: PathBuf,
}

impl EmailConfig {
    fn from_env() -> Self {
        Self {
            smtp_host: env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty()),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            smtp_user: env::var("SMTP_USER").ok(),
            smtp_pass: env::var("SMTP_PASS").ok(),
            smtp_from: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "Payroll System <noreply@payrollsystem.com>".to_string()),
            smtp_tls: env::var("SMTP_TLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR)),
        }
    }

    fn transport(&self, host: &str) -> AppResult<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if self.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| AppError::internal(format!("Invalid SMTP relay {}: {}", host, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let builder = builder.port(self.smtp_port);
        let builder = match (&self.smtp_user, &self.smtp_pass) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }
}

fn mailbox(address: &str) -> AppResult<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| AppError::validation(format!("Invalid email address '{}': {}", address, e)))
}

/// Assemble the MIME message; the HTML body always comes first.
pub fn build_message(
    job: &EmailJob,
    from: &str,
    attachment: Option<Vec<u8>>,
) -> AppResult<Message> {
    let builder = Message::builder()
        .from(mailbox(from)?)
        .to(mailbox(&job.to)?)
        .subject(job.subject.clone());

    let html = SinglePart::html(job.html.clone());

    let message = match (&job.attachment, attachment) {
        (Some(meta), Some(bytes)) => {
            let content_type = ContentType::parse(&meta.content_type).map_err(|e| {
                AppError::internal(format!("Invalid content type {}: {}", meta.content_type, e))
            })?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(html)
                    .singlepart(Attachment::new(meta.file_name.clone()).body(bytes, content_type)),
            )
        }
        _ => builder.singlepart(html),
    };

    message.map_err(|e| AppError::internal(format!("Failed to build email: {}", e)))
}

/// Email job handler - processes email sending jobs
pub async fn email_job_handler(job: EmailJob) -> Result<(), AppError> {
    let config = EmailConfig::from_env();
    let from = config.smtp_from.clone();

    tracing::info!(
        to = %job.to,
        from = %from,
        subject = %job.subject,
        attachment = job.attachment.as_ref().map(|a| a.file_name.as_str()),
        "Processing email job"
    );

    let attachment = match &job.attachment {
        Some(meta) => {
            let store = LocalFileStore::new(config.upload_dir.clone());
            Some(store.read(&meta.stored_path).await?)
        }
        None => None,
    };

    let Some(host) = config.smtp_host.as_deref() else {
        // Development mode: log the email instead of sending
        tracing::warn!("SMTP not configured - logging email instead of sending");
        tracing::info!(
            "=== EMAIL (not sent) ===\n\
             From: {}\n\
             To: {}\n\
             Subject: {}\n\
             Attachment: {} ({} bytes)\n\
             Body:\n{}\n\
             ========================",
            from,
            job.to,
            job.subject,
            job.attachment
                .as_ref()
                .map(|a| a.file_name.as_str())
                .unwrap_or("none"),
            attachment.as_ref().map(Vec::len).unwrap_or_default(),
            job.html
        );
        return Ok(());
    };

    let message = build_message(&job, &from, attachment)?;
    let transport = config.transport(host)?;

    transport.send(message).await.map_err(|e| {
        tracing::error!(to = %job.to, error = %e, "SMTP delivery failed");
        AppError::internal(format!("SMTP delivery failed: {}", e))
    })?;

    tracing::info!(to = %job.to, "Email sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> EmailJob {
        EmailJob::new(
            "asha@example.com",
            "Salary Slip - June 2024",
            "<p>Hello</p>",
        )
    }

    #[test]
    fn test_job_serializes_for_queue() {
        let job = job().with_attachment(EmailAttachment {
            file_name: "SalarySlip_EMP0001_June_2024.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            stored_path: "salary-slips/salary-slip-EMP0001-6-2024.pdf".to_string(),
        });
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["attachment"]["content_type"], "application/pdf");
        assert!(json.get("from").is_none());

        let legacy = serde_json::json!({
            "to": "a@example.com",
            "subject": "s",
            "html": "<p></p>"
        });
        let parsed: EmailJob = serde_json::from_value(legacy).unwrap();
        assert!(parsed.attachment.is_none());
    }

    #[test]
    fn test_build_message_with_attachment() {
        let job = job().with_attachment(EmailAttachment {
            file_name: "slip.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            stored_path: "salary-slips/slip.pdf".to_string(),
        });
        let message = build_message(&job, "noreply@example.com", Some(b"%PDF-1.3".to_vec()))
            .unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("slip.pdf"));
    }

    #[test]
    fn test_sender_is_the_configured_address() {
        let message = build_message(&job(), "payroll@company.com", None).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("From: payroll@company.com"));
        assert!(raw.contains("To: asha@example.com"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let mut job = job();
        job.to = "not-an-address".to_string();
        assert!(build_message(&job, "noreply@example.com", None).is_err());
    }
}
