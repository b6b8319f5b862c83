//! Panelpay - payment reconciliation service for panel registration and
//! ticket sales.
//!
//! # Architecture
//!
//! ```text
//!   Client ──► checkout ──► PENDING payment ──► provider checkout page
//!                                                     │
//!      ┌──────────────────────────────────────────────┘
//!      ▼
//!   verify endpoint / redirect / webhook
//!      │
//!      ▼
//!   Reconciler ──► provider verify API (authoritative status + amount)
//!      │
//!      ├─► decide (pure, panelpay-core)
//!      ├─► store.apply_transition  (payment + tickets + panel, one tx)
//!      └─► Notifier (after commit, best effort)
//! ```
//!
//! # Key Guarantees
//!
//! ## Exactly-once side effects
//!
//! A payment leaves `PENDING`/`FAILED` through a guarded write. Concurrent
//! reconciliations of the same reference race on that write; one applies,
//! the rest see `Superseded`. Tickets and emails follow only the winner.
//!
//! ## Fail closed on amounts
//!
//! A reported success whose amount differs from the stored amount by more
//! than one naira is rejected and the payment is left for manual review.
//!
//! ## Webhooks are hints
//!
//! Signed webhook bodies only name a reference. Status and amount come from
//! the provider's verify API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod checkout;
pub mod config;
pub mod metrics;
pub mod notifications;
pub mod panels;
pub mod providers;
pub mod reconciliation;
pub mod server;
pub mod signature;

pub use checkout::CheckoutService;
pub use config::Config;
pub use notifications::Notifier;
pub use panels::PanelService;
pub use providers::Gateways;
pub use reconciliation::{ReconcileRequest, Reconciler, Reconciliation};
pub use server::{AppState, WebhookSecrets, build_router};
