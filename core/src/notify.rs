//! Outbound email abstraction.

use crate::BoxFuture;
use thiserror::Error;

/// Mail delivery errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    /// Sender or recipient address could not be parsed.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// The message could not be assembled.
    #[error("Failed to build email: {0}")]
    Build(String),

    /// The transport refused or failed to deliver.
    #[error("Failed to send email: {0}")]
    Transport(String),
}

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Plain-text alternative
    pub text: String,
}

/// Sends emails.
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] if the message cannot be built or delivered.
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<(), MailError>>;
}
