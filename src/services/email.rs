//! Email delivery of overdue reminders

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::money::format_vnd,
};

/// Everything a reader needs to know about a late loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueReminder {
    pub loan_id: i64,
    pub reader_name: String,
    pub email: String,
    pub book_title: String,
    pub due_date: DateTime<Utc>,
    pub overdue_days: i64,
    /// Fine accrued so far, in VND
    pub fine: i64,
}

impl OverdueReminder {
    pub fn subject(&self) -> String {
        format!("Overdue book: {}", self.book_title)
    }

    pub fn body(&self) -> String {
        format!(
            r#"
Dear {name},

The book "{title}" was due back on {due}. It is now {days} day(s) overdue.

The fine accrued so far is {fine}. It increases every additional day the book is kept.

Please return the book to the library as soon as possible.
"#,
            name = self.reader_name,
            title = self.book_title,
            due = self.due_date.format("%d/%m/%Y"),
            days = self.overdue_days,
            fine = format_vnd(self.fine),
        )
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn html_body(text: &str) -> String {
    format!(
        r#"<html><body><p>{}</p></body></html>"#,
        html_escape(text.trim()).replace('\n', "<br>")
    )
}

/// Delivery channel for reminders
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderSender: Send + Sync {
    async fn send_overdue_reminder(&self, reminder: &OverdueReminder) -> AppResult<()>;
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> AppResult<Message> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("University Library");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Notification(format!("Invalid reader address '{}': {}", to, e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body(body)),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn mailer(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => mailer_builder,
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl ReminderSender for EmailService {
    async fn send_overdue_reminder(&self, reminder: &OverdueReminder) -> AppResult<()> {
        let email = self.build_message(&reminder.email, &reminder.subject(), &reminder.body())?;
        let mailer = self.mailer()?;

        // SMTP transport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Notification(format!("Failed to send email: {}", e)))?;

        tracing::info!(loan_id = reminder.loan_id, "Overdue reminder sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reminder() -> OverdueReminder {
        OverdueReminder {
            loan_id: 42,
            reader_name: "Tran Thi B".to_string(),
            email: "b.tran@student.edu.vn".to_string(),
            book_title: "Giải tích 1".to_string(),
            due_date: Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(),
            overdue_days: 5,
            fine: 50_000,
        }
    }

    #[test]
    fn test_reminder_body() {
        let body = reminder().body();
        assert!(body.contains("Dear Tran Thi B"));
        assert!(body.contains("due back on 15/03/2024"));
        assert!(body.contains("5 day(s) overdue"));
        assert!(body.contains("50.000 VNĐ"));
        assert_eq!(reminder().subject(), "Overdue book: Giải tích 1");
    }

    #[test]
    fn test_invalid_reader_address_is_notification_error() {
        let service = EmailService::new(EmailConfig::default());
        let err = service
            .build_message("not an address", "subject", "body")
            .unwrap_err();
        assert!(matches!(err, AppError::Notification(_)));
    }

    #[test]
    fn test_html_part_escapes_markup() {
        let mut r = reminder();
        r.book_title = "C++ & <Rust>".to_string();
        r.reader_name = "<b>Tran</b>".to_string();
        let html = html_body(&r.body());
        assert!(html.contains("The book &quot;C++ &amp; &lt;Rust&gt;&quot;"));
        assert!(html.contains("Dear &lt;b&gt;Tran&lt;/b&gt;,"));
        assert!(html.starts_with("<html><body><p>Dear"));
        assert_eq!(html_escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_message_builds_for_valid_address() {
        let service = EmailService::new(EmailConfig::default());
        let r = reminder();
        assert!(service.build_message(&r.email, &r.subject(), &r.body()).is_ok());
    }
}
