//! Recording [`Mailer`] for tests.

use panelpay_core::BoxFuture;
use panelpay_core::notify::{EmailMessage, MailError, Mailer};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Mailer that records every attempt and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingMailer {
    /// Create a mailer that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mailer whose every send fails.
    #[must_use]
    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.failing.store(true, Ordering::SeqCst);
        mailer
    }

    /// Successfully delivered messages.
    #[must_use]
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Delivered messages addressed to `to`.
    #[must_use]
    pub fn sent_to(&self, to: &str) -> Vec<EmailMessage> {
        self.sent().into_iter().filter(|m| m.to == to).collect()
    }

    /// Send attempts, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(MailError::Transport("simulated outage".to_string()));
            }
            self.sent
                .lock()
                .map_err(|_| MailError::Transport("mailer lock poisoned".to_string()))?
                .push(message);
            Ok(())
        })
    }
}
