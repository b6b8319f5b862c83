//! # Panelpay Core
//!
//! Domain types and rules for panel registration and ticket payments.
//!
//! This crate holds no I/O. It defines:
//!
//! - **Types**: identifiers, [`Money`](types::Money), statuses, providers, references
//! - **Pricing**: fixed panel plans and the ticket catalogue
//! - **Reconciliation rules**: mapping provider answers onto stored payments,
//!   amount tolerance, ticket expansion
//! - **Environment traits**: [`PaymentStore`](store::PaymentStore),
//!   [`PaymentGateway`](gateway::PaymentGateway), [`Mailer`](notify::Mailer),
//!   [`Clock`](environment::Clock)
//!
//! Services in the application crate fetch from the environment, ask
//! [`reconcile::decide`] what to do, and hand the resulting
//! [`TransitionRequest`](store::TransitionRequest) back to the store.

use std::future::Future;
use std::pin::Pin;

pub use chrono::{DateTime, Utc};

pub mod error;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod pricing;
pub mod provider;
pub mod reconcile;
pub mod reference;
pub mod status;
pub mod store;
pub mod types;
pub mod validation;

pub use error::PaymentError;
pub use provider::Provider;
pub use reference::PaymentReference;
pub use status::PaymentStatus;
pub use types::{Money, PanelId, PaymentId, TicketId};

/// Boxed, sendable future returned by the dyn-compatible environment traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Environment module - injected dependencies that are not storage, gateway
/// or mail.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
