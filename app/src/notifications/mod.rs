//! Email delivery.
//!
//! [`Notifier`] renders confirmations and hands them to a
//! [`Mailer`]. Delivery is best effort: failures are logged and counted,
//! never returned to the caller.

pub mod templates;

use crate::config::EmailConfig;
use crate::metrics;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use panelpay_core::BoxFuture;
use panelpay_core::model::{Attendee, Panel, PaymentRecord, Ticket};
use panelpay_core::notify::{EmailMessage, MailError, Mailer};
use std::sync::Arc;

/// Sends confirmation emails after a payment completes.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    admin_email: Option<String>,
    panel_root_domain: String,
}

impl Notifier {
    /// Create a notifier.
    #[must_use]
    pub fn new(
        mailer: Arc<dyn Mailer>,
        admin_email: Option<String>,
        panel_root_domain: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            admin_email,
            panel_root_domain: panel_root_domain.into(),
        }
    }

    /// Owner receipt plus admin notice for a paid panel.
    pub async fn panel_activated(&self, panel: &Panel, record: &PaymentRecord) {
        let panel_url = format!("https://{}.{}", panel.subdomain, self.panel_root_domain);
        self.deliver(record, templates::panel_confirmation(panel, record, &panel_url))
            .await;

        if let Some(admin) = &self.admin_email {
            self.deliver(record, templates::panel_admin_notice(panel, record, admin))
                .await;
        }
    }

    /// Ticket receipt for the buyer.
    pub async fn tickets_issued(&self, attendee: &Attendee, record: &PaymentRecord, tickets: &[Ticket]) {
        self.deliver(record, templates::ticket_confirmation(attendee, record, tickets))
            .await;
    }

    async fn deliver(&self, record: &PaymentRecord, message: EmailMessage) {
        let to = message.to.clone();
        let subject = message.subject.clone();

        match self.mailer.send(message).await {
            Ok(()) => {
                metrics::record_email(true);
                tracing::info!(reference = %record.reference, %to, %subject, "Email sent");
            }
            Err(e) => {
                metrics::record_email(false);
                tracing::warn!(
                    reference = %record.reference,
                    %to,
                    %subject,
                    error = %e,
                    "Email delivery failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("admin_email", &self.admin_email)
            .field("panel_root_domain", &self.panel_root_domain)
            .finish_non_exhaustive()
    }
}

/// Mailer that only logs. Used when no SMTP relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            tracing::info!(
                to = %message.to,
                subject = %message.subject,
                body = %message.text,
                "Email (console delivery)"
            );
            Ok(())
        })
    }
}

/// SMTP mailer using Lettre's async transport.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create an SMTP mailer.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] if the relay host or the sender address is invalid.
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from_name: &str,
        from_address: &str,
    ) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?
            .port(port);
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        let from = format!("{from_name} <{from_address}>")
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{from_address}: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    async fn deliver(&self, message: EmailMessage) -> Result<(), MailError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {e}", message.to)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .multipart(MultiPart::alternative_plain_html(message.text, message.html))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(self.deliver(message))
    }
}

/// Pick SMTP when a relay is configured, console delivery otherwise.
///
/// # Errors
///
/// Returns [`MailError`] if the SMTP settings are invalid.
pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    let Some(host) = &config.smtp_host else {
        tracing::warn!("SMTP_HOST not set; emails will be logged, not sent");
        return Ok(Arc::new(ConsoleMailer));
    };

    let credentials = config
        .smtp_username
        .clone()
        .zip(config.smtp_password.clone());

    let mailer = SmtpMailer::new(
        host,
        config.smtp_port,
        credentials,
        &config.from_name,
        &config.from_address,
    )?;
    Ok(Arc::new(mailer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_config(host: Option<&str>, from: &str) -> EmailConfig {
        EmailConfig {
            smtp_host: host.map(str::to_string),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            from_address: from.to_string(),
            from_name: "Panelpay".to_string(),
            admin_email: None,
        }
    }

    #[tokio::test]
    async fn test_console_mailer_accepts_everything() {
        let mailer = ConsoleMailer;
        let result = mailer
            .send(EmailMessage {
                to: "ada@example.com".to_string(),
                subject: "Hi".to_string(),
                html: "<p>Hi</p>".to_string(),
                text: "Hi".to_string(),
            })
            .await;
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_console_fallback_without_host() {
        assert!(mailer_from_config(&email_config(None, "noreply@example.com")).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_sender_is_rejected() {
        let result = mailer_from_config(&email_config(Some("smtp.example.com"), "not an address"));
        assert!(matches!(result, Err(MailError::InvalidAddress(_))));
    }
}
