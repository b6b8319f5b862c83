//! Axum glue shared by panelpay handlers.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         HTTP shell (Axum)               │  ← JSON, headers, signatures
//! │  - Request parsing                      │  ← correlation ids, tracing
//! │  - Error → status mapping               │
//! ├─────────────────────────────────────────┤
//! │         panelpay-core                   │
//! │  - Reconciliation rules                 │  ← no I/O
//! │  - Store / gateway / mailer traits      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Handlers return `Result<_, AppError>`; domain errors convert with `?`
//! through `From<PaymentError>`.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use extractors::{ClientIp, CorrelationId, RequestMeta, UserAgent};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationIdExt, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
