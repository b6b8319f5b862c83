//! HTTP API handlers.
//!
//! Handlers parse and shape JSON; services in the crate root do the work.

pub mod panels;
pub mod payments;
pub mod tickets;
pub mod webhooks;
